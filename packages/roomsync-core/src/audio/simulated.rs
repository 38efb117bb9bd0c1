//! Clock-driven audio backend that produces no sound.
//!
//! Used by the headless client to exercise the full engine without an audio
//! device: position advances with wall-clock time while playing and a
//! natural end of track is reported once the (configured) duration elapses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{AudioBackend, AudioNotifier, AudioOutput, AudioResult};
use crate::runtime::TaskSpawner;
use crate::utils::{clamp_position, Clock};

/// Backend whose outputs only keep time.
pub struct SimulatedAudioBackend {
    clock: Arc<dyn Clock>,
    spawner: Arc<dyn TaskSpawner>,
    track_duration: Option<Duration>,
    open_latency: Duration,
}

impl SimulatedAudioBackend {
    /// Creates a backend. Without a `track_duration` tracks never end on their own.
    pub fn new(
        clock: Arc<dyn Clock>,
        spawner: Arc<dyn TaskSpawner>,
        track_duration: Option<Duration>,
    ) -> Self {
        Self {
            clock,
            spawner,
            track_duration,
            open_latency: Duration::ZERO,
        }
    }

    /// Simulates buffering time before an open completes.
    #[must_use]
    pub fn with_open_latency(mut self, latency: Duration) -> Self {
        self.open_latency = latency;
        self
    }
}

#[async_trait]
impl AudioBackend for SimulatedAudioBackend {
    async fn open(&self, url: &str, notifier: AudioNotifier) -> AudioResult<Box<dyn AudioOutput>> {
        if !self.open_latency.is_zero() {
            tokio::time::sleep(self.open_latency).await;
        }
        log::debug!("[SimulatedAudio] Opened {}", url);
        Ok(Box::new(SimulatedOutput {
            url: url.to_string(),
            clock: Arc::clone(&self.clock),
            spawner: Arc::clone(&self.spawner),
            notifier,
            duration: self.track_duration.map(|d| d.as_secs_f64()),
            base_position: 0.0,
            playing_since_ms: None,
            end_watch: None,
        }))
    }
}

struct SimulatedOutput {
    url: String,
    clock: Arc<dyn Clock>,
    spawner: Arc<dyn TaskSpawner>,
    notifier: AudioNotifier,
    duration: Option<f64>,
    base_position: f64,
    playing_since_ms: Option<u64>,
    end_watch: Option<CancellationToken>,
}

impl SimulatedOutput {
    fn arm_end_watch(&mut self) {
        self.disarm_end_watch();
        let Some(duration) = self.duration else {
            return;
        };
        let remaining = (duration - self.position()).max(0.0);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let notifier = self.notifier.clone();
        self.spawner.spawn(Box::pin(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs_f64(remaining)) => notifier.finished(),
            }
        }));
        self.end_watch = Some(token);
    }

    fn disarm_end_watch(&mut self) {
        if let Some(token) = self.end_watch.take() {
            token.cancel();
        }
    }
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    async fn play(&mut self) -> AudioResult<()> {
        if self.playing_since_ms.is_none() {
            self.playing_since_ms = Some(self.clock.now_millis());
            self.arm_end_watch();
        }
        Ok(())
    }

    async fn pause(&mut self) -> AudioResult<()> {
        self.base_position = self.position();
        self.playing_since_ms = None;
        self.disarm_end_watch();
        Ok(())
    }

    async fn seek(&mut self, position_secs: f64) -> AudioResult<()> {
        self.base_position = clamp_position(position_secs, self.duration);
        if self.playing_since_ms.is_some() {
            self.playing_since_ms = Some(self.clock.now_millis());
            self.arm_end_watch();
        }
        Ok(())
    }

    fn position(&self) -> f64 {
        let elapsed = self
            .playing_since_ms
            .map(|since| self.clock.now_millis().saturating_sub(since) as f64 / 1000.0)
            .unwrap_or(0.0);
        clamp_position(self.base_position + elapsed, self.duration)
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    async fn release(&mut self) -> AudioResult<()> {
        self.disarm_end_watch();
        self.playing_since_ms = None;
        log::debug!("[SimulatedAudio] Released {}", self.url);
        Ok(())
    }
}

impl Drop for SimulatedOutput {
    fn drop(&mut self) {
        self.disarm_end_watch();
    }
}
