//! Trait abstractions over the platform audio stack.
//!
//! The controller depends on these traits rather than a concrete player, so
//! the engine runs unchanged against a mobile audio service, a desktop sink,
//! the simulated backend, or a recording mock in tests.

use async_trait::async_trait;

use super::{AudioNotifier, AudioResult};

/// Factory for live audio resources.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Opens a resource bound to `url`, initially paused at position 0.
    ///
    /// The returned output reports natural end of track and runtime failures
    /// through `notifier`.
    ///
    /// # Arguments
    /// * `url` - The resolved URL of the track
    /// * `notifier` - Generation-stamped notice handle for this resource
    async fn open(&self, url: &str, notifier: AudioNotifier) -> AudioResult<Box<dyn AudioOutput>>;
}

/// A single live audio resource.
///
/// Owned exclusively by [`AudioController`](super::AudioController); nothing
/// else may hold or mutate it.
#[async_trait]
pub trait AudioOutput: Send {
    /// Starts or resumes audio output.
    async fn play(&mut self) -> AudioResult<()>;

    /// Pauses audio output, keeping the position.
    async fn pause(&mut self) -> AudioResult<()>;

    /// Moves the playhead. The caller has already clamped the target.
    async fn seek(&mut self, position_secs: f64) -> AudioResult<()>;

    /// Current playhead position in seconds.
    fn position(&self) -> f64;

    /// Track duration in seconds, once known.
    fn duration(&self) -> Option<f64>;

    /// Stops output and frees the underlying resource.
    async fn release(&mut self) -> AudioResult<()>;
}
