//! Event emitter abstraction for decoupling the engine from delivery.
//!
//! The engine and the latency registry depend on the [`EventEmitter`] trait
//! rather than concrete broadcast channels, enabling testing and alternative
//! delivery (a mobile host bridge, a GUI event loop).

use super::{ConnectionEvent, LatencyEvent, PlaybackEvent};

/// Trait for emitting UI events without knowledge of delivery.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_connection(ConnectionEvent::Connected { timestamp: now_millis() });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a playback event (state change, load failure, completion).
    fn emit_playback(&self, event: PlaybackEvent);

    /// Emits a connection lifecycle event.
    fn emit_connection(&self, event: ConnectionEvent);

    /// Emits a latency configuration event.
    fn emit_latency(&self, event: LatencyEvent);
}

/// No-op emitter for headless use or testing.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_playback(&self, _event: PlaybackEvent) {}

    fn emit_connection(&self, _event: ConnectionEvent) {}

    fn emit_latency(&self, _event: LatencyEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }

    fn emit_connection(&self, event: ConnectionEvent) {
        tracing::debug!(?event, "connection_event");
    }

    fn emit_latency(&self, event: LatencyEvent) {
        tracing::debug!(?event, "latency_event");
    }
}
