//! Centralized error types for the RoomSync core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps every error to a machine-readable code via [`ErrorCode`]
//! - Serializes errors for delivery to a UI or host bridge

use serde::Serialize;
use thiserror::Error;

use crate::audio::AudioError;
use crate::protocol::ProtocolError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for AudioError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnresolvedUrl(_) => "unresolved_url",
            Self::Open { .. } => "audio_open_failed",
            Self::Control(_) => "audio_control_failed",
        }
    }
}

impl ErrorCode for ProtocolError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownEvent(_) => "unknown_event",
            Self::MalformedPayload { .. } => "malformed_payload",
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum SyncError {
    /// The local audio stack failed.
    #[error("Audio error: {0}")]
    Audio(String),

    /// The authority sent an event this client does not know.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// An event payload could not be decoded.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reading or writing persisted state failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The engine task has shut down and no longer accepts input.
    #[error("Engine stopped")]
    EngineStopped,
}

impl ErrorCode for SyncError {
    fn code(&self) -> &'static str {
        match self {
            Self::Audio(_) => "audio_error",
            Self::UnknownEvent(_) => "unknown_event",
            Self::MalformedEvent(_) => "malformed_event",
            Self::Configuration(_) => "configuration_error",
            Self::Io(_) => "io_error",
            Self::EngineStopped => "engine_stopped",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub use crate::audio::AudioResult;
pub use crate::protocol::ProtocolResult;

/// Convenient Result alias for crate-wide operations.
pub type SyncResult<T> = Result<T, SyncError>;

impl From<AudioError> for SyncError {
    fn from(err: AudioError) -> Self {
        Self::Audio(err.to_string())
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownEvent(name) => Self::UnknownEvent(name),
            other => Self::MalformedEvent(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
