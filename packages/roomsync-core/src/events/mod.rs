//! Event system for UI notifications.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the engine and registry to emit events
//! - [`BroadcastEventBridge`] for fan-out to UI subscribers
//! - Event types for playback, connection and latency changes
//!
//! Events are notifications only. The authoritative read model is the
//! engine's `SnapshotView`; a lagging subscriber that misses events can
//! always re-read it.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::services::sync_engine::SyncState;

/// Events broadcast to UI subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Events from the reconciliation state machine.
    Playback(PlaybackEvent),

    /// Events from the connection lifecycle.
    Connection(ConnectionEvent),

    /// Events related to zone latency configuration.
    Latency(LatencyEvent),
}

/// Events related to local playback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// The engine's machine state changed.
    StateChanged {
        state: SyncState,
        #[serde(rename = "trackId", skip_serializing_if = "Option::is_none")]
        track_id: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A track failed to load. Non-blocking notice for the UI.
    LoadFailed {
        #[serde(rename = "trackId")]
        track_id: String,
        message: String,
        /// True if a retry has been scheduled.
        #[serde(rename = "willRetry")]
        will_retry: bool,
        timestamp: u64,
    },
    /// The loaded track reached its natural end and was acknowledged.
    TrackCompleted {
        #[serde(rename = "trackId")]
        track_id: String,
        timestamp: u64,
    },
}

/// Events related to the link with the playback authority.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// First connection of this engine.
    Connected { timestamp: u64 },
    /// Connection re-established after a loss.
    Reconnected { timestamp: u64 },
    /// Connection lost. Playback continues locally.
    Disconnected {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: u64,
    },
    /// The authority has been unreachable long enough that the snapshot is stale.
    SnapshotStale { timestamp: u64 },
}

/// Events related to zone latency configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LatencyEvent {
    /// A zone's delay or active flag changed.
    ZoneUpdated {
        zone: String,
        #[serde(rename = "delayMs")]
        delay_ms: u64,
        active: bool,
        timestamp: u64,
    },
    /// A zone was removed from the registry.
    ZoneRemoved { zone: String, timestamp: u64 },
}

impl From<PlaybackEvent> for ClientEvent {
    fn from(event: PlaybackEvent) -> Self {
        ClientEvent::Playback(event)
    }
}

impl From<ConnectionEvent> for ClientEvent {
    fn from(event: ConnectionEvent) -> Self {
        ClientEvent::Connection(event)
    }
}

impl From<LatencyEvent> for ClientEvent {
    fn from(event: LatencyEvent) -> Self {
        ClientEvent::Latency(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_event_serializes_with_category_and_type() {
        let event: ClientEvent = PlaybackEvent::LoadFailed {
            track_id: "a".into(),
            message: "503".into(),
            will_retry: true,
            timestamp: 5,
        }
        .into();

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "category": "playback",
                "type": "loadFailed",
                "trackId": "a",
                "message": "503",
                "willRetry": true,
                "timestamp": 5
            })
        );
    }

    #[test]
    fn disconnected_omits_missing_reason() {
        let event: ClientEvent = ConnectionEvent::Disconnected {
            reason: None,
            timestamp: 1,
        }
        .into();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"category": "connection", "type": "disconnected", "timestamp": 1})
        );
    }
}
