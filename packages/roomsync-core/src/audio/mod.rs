//! Local audio output: the platform seam and the single-resource controller.
//!
//! - [`traits`]: `AudioBackend` / `AudioOutput` abstractions over the platform audio stack
//! - [`controller`]: `AudioController`, sole owner of the live output handle
//! - [`simulated`]: clock-driven backend for headless runs

use std::sync::Arc;

use thiserror::Error;

pub mod controller;
pub mod simulated;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{AudioController, AudioSessionHandle, AudioState, LoadOutcome, LoadTicket};
pub use simulated::SimulatedAudioBackend;
pub use traits::{AudioBackend, AudioOutput};

/// Errors from the local audio stack.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The track reached the engine without a usable URL.
    #[error("Track {0} has no resolved URL")]
    UnresolvedUrl(String),

    /// The audio stack could not open the resolved URL.
    #[error("Failed to open {url}: {message}")]
    Open { url: String, message: String },

    /// A play/pause/seek/release command failed on a live resource.
    #[error("Audio control failed: {0}")]
    Control(String),
}

impl AudioError {
    /// Returns true if a later attempt at the same URL could succeed.
    ///
    /// An unresolved URL will not resolve itself, and control failures are
    /// not load failures.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

pub type AudioResult<T> = Result<T, AudioError>;

/// Asynchronous notices a live output reports after it has been opened.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioNotice {
    /// Playback reached the natural end of the track.
    Finished,
    /// The resource failed while playing.
    Failed(String),
}

pub(crate) type NoticeSink = Arc<dyn Fn(u64, AudioNotice) + Send + Sync>;

/// Handle given to an output at open time for reporting [`AudioNotice`]s.
///
/// Every notice carries the load generation it was opened under, so notices
/// from a resource that has since been superseded are recognized as stale.
#[derive(Clone)]
pub struct AudioNotifier {
    generation: u64,
    sink: NoticeSink,
}

impl AudioNotifier {
    pub(crate) fn new(generation: u64, sink: NoticeSink) -> Self {
        Self { generation, sink }
    }

    /// Creates a notifier that drops everything. For backends used outside the engine.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            generation: 0,
            sink: Arc::new(|_, _| {}),
        }
    }

    /// The load generation this notifier belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports a natural end of track.
    pub fn finished(&self) {
        (self.sink)(self.generation, AudioNotice::Finished);
    }

    /// Reports a playback failure on a live resource.
    pub fn failed(&self, message: impl Into<String>) {
        (self.sink)(self.generation, AudioNotice::Failed(message.into()));
    }
}

impl std::fmt::Debug for AudioNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioNotifier")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
