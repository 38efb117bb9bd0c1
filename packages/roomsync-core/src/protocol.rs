//! Wire-level message types exchanged with the playback authority.
//!
//! Inbound events arrive from the connection adapter as `(name, payload)`
//! pairs and are decoded into [`RemoteEvent`]. Outbound intents are encoded
//! from [`OutboundIntent`] into the same shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol_constants::{
    EVENT_PLAYBACK_STATE, EVENT_POSITION_UPDATE, EVENT_SYNC_PAUSE, EVENT_SYNC_PLAY,
    EVENT_SYNC_SEEK, EVENT_TRACK_CHANGED, INTENT_NEXT_TRACK, INTENT_PAUSE, INTENT_PLAY,
    INTENT_PREVIOUS_TRACK, INTENT_SEEK, INTENT_TRACK_COMPLETED,
};
use crate::types::{PlaybackSnapshot, TrackRef};

/// Errors decoding an inbound event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed {event} payload: {source}")]
    MalformedPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// A remote synchronization event from the authority.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Full snapshot, sent on connect or resume. Replaces local state wholesale.
    FullSnapshot(PlaybackSnapshot),
    TrackChanged {
        track: TrackRef,
        position: f64,
        is_playing: bool,
    },
    SyncPlay {
        track: TrackRef,
        position: f64,
        /// Wall-clock instant (epoch ms) at which audio should be heard.
        start_time_ms: u64,
    },
    SyncPause {
        position: f64,
    },
    SyncSeek {
        position: f64,
        track: Option<TrackRef>,
    },
    PositionTick {
        track: Option<TrackRef>,
        position: f64,
        is_playing: bool,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackChangedPayload {
    track: TrackRef,
    #[serde(default)]
    position: f64,
    #[serde(default)]
    is_playing: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncPlayPayload {
    track: TrackRef,
    #[serde(default)]
    position: f64,
    start_time: u64,
}

#[derive(Deserialize)]
struct SyncPausePayload {
    position: f64,
}

#[derive(Deserialize)]
struct SyncSeekPayload {
    position: f64,
    #[serde(default)]
    track: Option<TrackRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionTickPayload {
    #[serde(default)]
    track: Option<TrackRef>,
    position: f64,
    #[serde(default)]
    is_playing: bool,
}

fn decode<T: for<'de> Deserialize<'de>>(
    event: &'static str,
    payload: serde_json::Value,
) -> ProtocolResult<T> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::MalformedPayload { event, source })
}

impl RemoteEvent {
    /// Decodes an event delivered by the connection adapter.
    pub fn from_wire(name: &str, payload: serde_json::Value) -> ProtocolResult<Self> {
        match name {
            EVENT_PLAYBACK_STATE => Ok(Self::FullSnapshot(decode(EVENT_PLAYBACK_STATE, payload)?)),
            EVENT_TRACK_CHANGED => {
                let p: TrackChangedPayload = decode(EVENT_TRACK_CHANGED, payload)?;
                Ok(Self::TrackChanged {
                    track: p.track,
                    position: p.position,
                    is_playing: p.is_playing,
                })
            }
            EVENT_SYNC_PLAY => {
                let p: SyncPlayPayload = decode(EVENT_SYNC_PLAY, payload)?;
                Ok(Self::SyncPlay {
                    track: p.track,
                    position: p.position,
                    start_time_ms: p.start_time,
                })
            }
            EVENT_SYNC_PAUSE => {
                let p: SyncPausePayload = decode(EVENT_SYNC_PAUSE, payload)?;
                Ok(Self::SyncPause {
                    position: p.position,
                })
            }
            EVENT_SYNC_SEEK => {
                let p: SyncSeekPayload = decode(EVENT_SYNC_SEEK, payload)?;
                Ok(Self::SyncSeek {
                    position: p.position,
                    track: p.track,
                })
            }
            EVENT_POSITION_UPDATE => {
                let p: PositionTickPayload = decode(EVENT_POSITION_UPDATE, payload)?;
                Ok(Self::PositionTick {
                    track: p.track,
                    position: p.position,
                    is_playing: p.is_playing,
                })
            }
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Returns the wire name of this event, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FullSnapshot(_) => EVENT_PLAYBACK_STATE,
            Self::TrackChanged { .. } => EVENT_TRACK_CHANGED,
            Self::SyncPlay { .. } => EVENT_SYNC_PLAY,
            Self::SyncPause { .. } => EVENT_SYNC_PAUSE,
            Self::SyncSeek { .. } => EVENT_SYNC_SEEK,
            Self::PositionTick { .. } => EVENT_POSITION_UPDATE,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// An intent sent to the authority. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundIntent {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    Seek {
        position: f64,
    },
    TrackCompleted {
        #[serde(rename = "trackId")]
        track_id: String,
    },
}

impl OutboundIntent {
    /// Returns the wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => INTENT_PLAY,
            Self::Pause => INTENT_PAUSE,
            Self::NextTrack => INTENT_NEXT_TRACK,
            Self::PreviousTrack => INTENT_PREVIOUS_TRACK,
            Self::Seek { .. } => INTENT_SEEK,
            Self::TrackCompleted { .. } => INTENT_TRACK_COMPLETED,
        }
    }

    /// Returns the wire payload (empty object for argument-less intents).
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Seek { position } => serde_json::json!({ "position": position }),
            Self::TrackCompleted { track_id } => serde_json::json!({ "trackId": track_id }),
            _ => serde_json::json!({}),
        }
    }
}
