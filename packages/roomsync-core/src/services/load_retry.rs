//! Retry classification for failed audio loads.
//!
//! Local-file endpoints are served by the authority itself and may not be
//! ready the instant a track changes, so a failed open is retried after a
//! fixed backoff. Streaming URLs come from an external catalog; a failure
//! there will not fix itself within seconds and is terminal.

use std::time::Duration;

use crate::audio::AudioError;
use crate::state::EngineConfig;
use crate::types::TrackRef;

/// Outcome of [`LoadRetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Bounded, classified retry for load failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRetryPolicy {
    delay: Duration,
    max_retries: u32,
}

impl LoadRetryPolicy {
    #[must_use]
    pub fn new(delay: Duration, max_retries: u32) -> Self {
        Self { delay, max_retries }
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Duration::from_millis(config.local_file_retry_delay_ms),
            config.local_file_max_retries,
        )
    }

    /// Decides whether a failed load of `track` should be attempted again.
    ///
    /// # Arguments
    /// * `track` - The track whose load failed
    /// * `error` - The failure reported by the audio stack
    /// * `retries_so_far` - Retries already spent on this track
    #[must_use]
    pub fn decide(&self, track: &TrackRef, error: &AudioError, retries_so_far: u32) -> RetryDecision {
        if !track.source_kind.is_local_file() || !error.is_retryable() {
            return RetryDecision::GiveUp;
        }
        if retries_so_far >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay)
    }
}

impl Default for LoadRetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;

    fn open_error() -> AudioError {
        AudioError::Open {
            url: "http://srv/a".into(),
            message: "connection refused".into(),
        }
    }

    #[test]
    fn local_file_gets_exactly_one_retry() {
        let policy = LoadRetryPolicy::default();
        let track = TrackRef::new("a", "A", SourceKind::LocalFile, "http://srv/a");

        assert_eq!(
            policy.decide(&track, &open_error(), 0),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(policy.decide(&track, &open_error(), 1), RetryDecision::GiveUp);
    }

    #[test]
    fn streaming_tracks_are_never_retried() {
        let policy = LoadRetryPolicy::default();
        for kind in [SourceKind::StreamingPreview, SourceKind::StreamingFull] {
            let track = TrackRef::new("s", "S", kind, "https://cdn/s");
            assert_eq!(policy.decide(&track, &open_error(), 0), RetryDecision::GiveUp);
        }
    }

    #[test]
    fn unresolved_url_is_terminal() {
        let policy = LoadRetryPolicy::default();
        let track = TrackRef::new("a", "A", SourceKind::LocalFile, "");
        assert_eq!(
            policy.decide(&track, &AudioError::UnresolvedUrl("a".into()), 0),
            RetryDecision::GiveUp
        );
    }
}
