//! Recording audio backend for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AudioBackend, AudioError, AudioNotifier, AudioOutput, AudioResult};

/// One call observed by the recording backend, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Open(String),
    Play,
    Pause,
    Seek(f64),
    Release,
}

#[derive(Default)]
struct Shared {
    calls: Vec<AudioCall>,
    position: f64,
    duration: Option<f64>,
    failures: HashMap<String, usize>,
    open_delay: Option<Duration>,
    notifiers: Vec<AudioNotifier>,
    opened: usize,
    released: usize,
}

/// Backend whose outputs log every call into a shared list.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` opens of `url` fail with a retryable error.
    pub fn fail_next_opens(&self, url: &str, times: usize) {
        self.shared.lock().failures.insert(url.to_string(), times);
    }

    /// Delays every open by `delay` (tokio time, so paused clocks apply).
    pub fn set_open_delay(&self, delay: Duration) {
        self.shared.lock().open_delay = Some(delay);
    }

    pub fn set_position(&self, position: f64) {
        self.shared.lock().position = position;
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        self.shared.lock().duration = duration;
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.shared.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.shared.lock().calls.clear();
    }

    fn count(&self, pred: impl Fn(&AudioCall) -> bool) -> usize {
        self.shared.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn opens(&self) -> usize {
        self.count(|c| matches!(c, AudioCall::Open(_)))
    }

    pub fn plays(&self) -> usize {
        self.count(|c| matches!(c, AudioCall::Play))
    }

    pub fn pauses(&self) -> usize {
        self.count(|c| matches!(c, AudioCall::Pause))
    }

    pub fn releases(&self) -> usize {
        self.count(|c| matches!(c, AudioCall::Release))
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.shared
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                AudioCall::Seek(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Resources opened and not yet released.
    pub fn live_resources(&self) -> usize {
        let shared = self.shared.lock();
        shared.opened - shared.released
    }

    /// Notifier handed to the most recently opened output.
    pub fn last_notifier(&self) -> Option<AudioNotifier> {
        self.shared.lock().notifiers.last().cloned()
    }
}

#[async_trait]
impl AudioBackend for RecordingBackend {
    async fn open(&self, url: &str, notifier: AudioNotifier) -> AudioResult<Box<dyn AudioOutput>> {
        let delay = {
            let mut shared = self.shared.lock();
            shared.calls.push(AudioCall::Open(url.to_string()));
            shared.open_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut shared = self.shared.lock();
        if let Some(remaining) = shared.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AudioError::Open {
                    url: url.to_string(),
                    message: "scripted failure".into(),
                });
            }
        }
        shared.opened += 1;
        shared.position = 0.0;
        shared.notifiers.push(notifier);
        Ok(Box::new(RecordingOutput {
            shared: Arc::clone(&self.shared),
            released: false,
        }))
    }
}

struct RecordingOutput {
    shared: Arc<Mutex<Shared>>,
    released: bool,
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn play(&mut self) -> AudioResult<()> {
        self.shared.lock().calls.push(AudioCall::Play);
        Ok(())
    }

    async fn pause(&mut self) -> AudioResult<()> {
        self.shared.lock().calls.push(AudioCall::Pause);
        Ok(())
    }

    async fn seek(&mut self, position_secs: f64) -> AudioResult<()> {
        let mut shared = self.shared.lock();
        shared.calls.push(AudioCall::Seek(position_secs));
        shared.position = position_secs;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.shared.lock().position
    }

    fn duration(&self) -> Option<f64> {
        self.shared.lock().duration
    }

    async fn release(&mut self) -> AudioResult<()> {
        let mut shared = self.shared.lock();
        shared.calls.push(AudioCall::Release);
        if !self.released {
            self.released = true;
            shared.released += 1;
        }
        Ok(())
    }
}
