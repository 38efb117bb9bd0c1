//! Single-resource audio controller.
//!
//! Owns the one live [`AudioOutput`] and exposes load/play/pause/seek/stop
//! with the guarantees the engine relies on:
//!
//! - at most one live resource: `load` releases the previous one first
//! - every load bumps a generation; completions from older generations are
//!   stale and their resources are released on arrival
//! - commands issued while a load is in flight are recorded and applied
//!   when (and only if) that load completes
//!
//! The controller is not `Sync` and is never shared: the engine owns it and
//! calls it from its single event queue, which serializes all operations.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use super::{AudioBackend, AudioError, AudioNotifier, AudioOutput, AudioResult, NoticeSink};
use crate::protocol_constants::RESUME_POSITION_EPSILON_SECS;
use crate::types::TrackRef;
use crate::utils::clamp_position;

/// Lifecycle state of the local audio resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AudioState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

/// Read-only view of the live playback resource.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AudioSessionHandle {
    pub loaded_track_id: Option<String>,
    pub state: AudioState,
    /// Position captured at the last pause, restored on resume.
    pub pause_position_seconds: f64,
}

/// Desired state recorded while a load is in flight.
#[derive(Debug, Clone, Copy)]
struct PendingLoad {
    start_position: f64,
    play: bool,
}

/// An in-flight load.
///
/// The caller drives `open` to completion off the event queue and hands the
/// result back through [`AudioController::complete_load`] with `generation`.
pub struct LoadTicket {
    pub generation: u64,
    pub open: BoxFuture<'static, AudioResult<Box<dyn AudioOutput>>>,
}

/// Result of applying a load completion.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The resource is live in the requested play/pause state.
    Ready { track: TrackRef, playing: bool },
    /// The load failed. The desired state is returned so a retry can reuse it.
    Failed {
        track: TrackRef,
        start_position: f64,
        play: bool,
        error: AudioError,
    },
    /// Superseded by a newer load or a stop; nothing changed.
    Stale,
}

/// Owner of the single local audio resource.
pub struct AudioController {
    backend: Arc<dyn AudioBackend>,
    notices: NoticeSink,
    session: AudioSessionHandle,
    loaded_track: Option<TrackRef>,
    output: Option<Box<dyn AudioOutput>>,
    pending: Option<PendingLoad>,
    generation: u64,
}

impl AudioController {
    /// Creates a controller with nothing loaded.
    ///
    /// `notices` receives every [`AudioNotice`](super::AudioNotice) from
    /// outputs opened by this controller, stamped with their load generation.
    pub(crate) fn new(backend: Arc<dyn AudioBackend>, notices: NoticeSink) -> Self {
        Self {
            backend,
            notices,
            session: AudioSessionHandle::default(),
            loaded_track: None,
            output: None,
            pending: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn session(&self) -> &AudioSessionHandle {
        &self.session
    }

    /// The track currently loaded, loading, or errored.
    #[must_use]
    pub fn loaded_track(&self) -> Option<&TrackRef> {
        self.loaded_track.as_ref()
    }

    /// Generation of the most recent load or stop.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current playhead: live while playing, the captured position otherwise.
    #[must_use]
    pub fn position(&self) -> f64 {
        match (&self.output, self.session.state) {
            (Some(output), AudioState::Playing) => output.position(),
            _ => self.session.pause_position_seconds,
        }
    }

    /// Starts loading `track`, tearing down any existing resource first.
    ///
    /// Returns the open future for the caller to drive. An unresolved URL
    /// fails immediately without touching the backend.
    pub async fn load(
        &mut self,
        track: TrackRef,
        start_position: f64,
        play: bool,
    ) -> AudioResult<LoadTicket> {
        self.release_output().await;
        self.generation += 1;
        let generation = self.generation;
        let start_position = clamp_position(start_position, None);

        self.session = AudioSessionHandle {
            loaded_track_id: Some(track.id.clone()),
            state: AudioState::Loading,
            pause_position_seconds: start_position,
        };

        let Some(url) = track.playable_url().map(str::to_string) else {
            log::warn!(
                "[AudioController] Track {} has no resolved URL, failing load",
                track.id
            );
            self.session.state = AudioState::Error;
            self.pending = None;
            let id = track.id.clone();
            self.loaded_track = Some(track);
            return Err(AudioError::UnresolvedUrl(id));
        };

        log::info!(
            "[AudioController] Loading {} (gen={}, start={:.2}s, play={})",
            track.id,
            generation,
            start_position,
            play
        );

        self.pending = Some(PendingLoad {
            start_position,
            play,
        });
        self.loaded_track = Some(track);

        let backend = Arc::clone(&self.backend);
        let notifier = AudioNotifier::new(generation, Arc::clone(&self.notices));
        Ok(LoadTicket {
            generation,
            open: Box::pin(async move { backend.open(&url, notifier).await }),
        })
    }

    /// Applies the result of a [`LoadTicket`]'s open future.
    pub async fn complete_load(
        &mut self,
        generation: u64,
        result: AudioResult<Box<dyn AudioOutput>>,
    ) -> LoadOutcome {
        let pending = match self.pending {
            Some(pending) if generation == self.generation => pending,
            _ => {
                if let Ok(mut stale) = result {
                    log::debug!(
                        "[AudioController] Releasing stale resource (gen={}, current={})",
                        generation,
                        self.generation
                    );
                    if let Err(e) = stale.release().await {
                        log::warn!("[AudioController] Stale release failed (ignored): {}", e);
                    }
                }
                return LoadOutcome::Stale;
            }
        };
        self.pending = None;

        let Some(track) = self.loaded_track.clone() else {
            return LoadOutcome::Stale;
        };

        let mut output = match result {
            Ok(output) => output,
            Err(error) => {
                log::warn!("[AudioController] Load of {} failed: {}", track.id, error);
                self.session.state = AudioState::Error;
                return LoadOutcome::Failed {
                    track,
                    start_position: pending.start_position,
                    play: pending.play,
                    error,
                };
            }
        };

        let start = clamp_position(pending.start_position, output.duration());
        if start > 0.0 {
            if let Err(e) = output.seek(start).await {
                log::warn!("[AudioController] Initial seek to {:.2}s failed: {}", start, e);
            }
        }
        self.session.pause_position_seconds = start;

        if pending.play {
            if let Err(error) = output.play().await {
                log::warn!("[AudioController] Play after load failed: {}", error);
                if let Err(e) = output.release().await {
                    log::warn!("[AudioController] Release failed (ignored): {}", e);
                }
                self.session.state = AudioState::Error;
                return LoadOutcome::Failed {
                    track,
                    start_position: start,
                    play: true,
                    error,
                };
            }
            self.session.state = AudioState::Playing;
        } else {
            self.session.state = AudioState::Paused;
        }

        self.output = Some(output);
        log::info!(
            "[AudioController] {} ready (gen={}, {})",
            track.id,
            generation,
            if pending.play { "playing" } else { "paused" }
        );
        LoadOutcome::Ready {
            track,
            playing: pending.play,
        }
    }

    /// Starts or resumes playback. No-op if already playing.
    ///
    /// Resuming restores the position captured by [`pause`](Self::pause)
    /// if the resource has drifted from it.
    pub async fn play(&mut self) -> AudioResult<()> {
        match self.session.state {
            AudioState::Playing => Ok(()),
            AudioState::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.play = true;
                }
                Ok(())
            }
            AudioState::Paused => {
                let Some(output) = self.output.as_mut() else {
                    return Ok(());
                };
                let target = self.session.pause_position_seconds;
                if (output.position() - target).abs() > RESUME_POSITION_EPSILON_SECS {
                    output.seek(target).await?;
                }
                output.play().await?;
                self.session.state = AudioState::Playing;
                Ok(())
            }
            AudioState::Idle | AudioState::Error => {
                log::debug!(
                    "[AudioController] play() ignored in {:?}",
                    self.session.state
                );
                Ok(())
            }
        }
    }

    /// Pauses playback, capturing the live position first. No-op unless playing.
    pub async fn pause(&mut self) -> AudioResult<()> {
        match self.session.state {
            AudioState::Playing => {
                let Some(output) = self.output.as_mut() else {
                    return Ok(());
                };
                let position = output.position();
                output.pause().await?;
                self.session.pause_position_seconds = position;
                self.session.state = AudioState::Paused;
                Ok(())
            }
            AudioState::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.play = false;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Moves the playhead, clamped to `[0, duration]`. Returns the applied target.
    ///
    /// While loading, replaces the start position of the in-flight load.
    pub async fn seek(&mut self, position_secs: f64) -> AudioResult<f64> {
        match self.session.state {
            AudioState::Loading => {
                let target = clamp_position(position_secs, None);
                if let Some(pending) = self.pending.as_mut() {
                    pending.start_position = target;
                }
                self.session.pause_position_seconds = target;
                Ok(target)
            }
            AudioState::Playing | AudioState::Paused => {
                let Some(output) = self.output.as_mut() else {
                    return Ok(self.session.pause_position_seconds);
                };
                let target = clamp_position(position_secs, output.duration());
                output.seek(target).await?;
                if self.session.state == AudioState::Paused {
                    self.session.pause_position_seconds = target;
                }
                Ok(target)
            }
            AudioState::Idle | AudioState::Error => Ok(clamp_position(position_secs, None)),
        }
    }

    /// Releases the resource entirely and invalidates any in-flight load.
    ///
    /// Always succeeds; hardware errors during release are logged.
    pub async fn stop(&mut self) {
        self.release_output().await;
        self.generation += 1;
        self.pending = None;
        self.loaded_track = None;
        self.session = AudioSessionHandle::default();
        log::info!("[AudioController] Stopped (gen={})", self.generation);
    }

    /// Records a natural end of track reported under `generation`.
    ///
    /// Returns the finished track, or `None` if the notice is stale or the
    /// resource was not playing.
    pub fn mark_finished(&mut self, generation: u64) -> Option<TrackRef> {
        if generation != self.generation || self.session.state != AudioState::Playing {
            return None;
        }
        let end = self
            .output
            .as_ref()
            .map(|o| o.duration().unwrap_or_else(|| o.position()))
            .unwrap_or(self.session.pause_position_seconds);
        self.session.pause_position_seconds = end;
        self.session.state = AudioState::Paused;
        self.loaded_track.clone()
    }

    /// Records a runtime failure reported under `generation` and drops the resource.
    pub async fn mark_failed(&mut self, generation: u64) -> Option<TrackRef> {
        if generation != self.generation || self.output.is_none() {
            return None;
        }
        self.release_output().await;
        self.session.state = AudioState::Error;
        self.loaded_track.clone()
    }

    async fn release_output(&mut self) {
        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.release().await {
                log::warn!("[AudioController] Release failed (ignored): {}", e);
            }
        }
    }
}
