//! Connection lifecycle abstraction.
//!
//! The transport that talks to the playback authority (a socket client, a
//! host bridge, the headless NDJSON driver) reports what happens to the link
//! through the [`ConnectionLifecycle`] trait. Raw signals may repeat; the
//! [`ConnectionTracker`] turns them into edge-triggered transitions so the
//! engine reacts once per change.

use serde::Serialize;

use crate::error::SyncResult;

/// Trait implemented by whatever consumes the authority's connection.
///
/// # Example
///
/// ```ignore
/// struct SocketAdapter {
///     lifecycle: Arc<dyn ConnectionLifecycle>,
/// }
///
/// impl SocketAdapter {
///     fn on_frame(&self, name: &str, payload: serde_json::Value) {
///         if let Err(e) = self.lifecycle.on_event(name, payload) {
///             log::warn!("[Socket] Dropped frame: {}", e);
///         }
///     }
/// }
/// ```
pub trait ConnectionLifecycle: Send + Sync {
    /// The link to the authority is up. A full snapshot is expected next.
    fn on_connected(&self);

    /// The link to the authority was lost.
    fn on_disconnected(&self, reason: Option<String>);

    /// A named event arrived from the authority.
    fn on_event(&self, name: &str, payload: serde_json::Value) -> SyncResult<()>;
}

/// Raw connection signal as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
    Connected,
    Disconnected { reason: Option<String> },
}

/// Connection sub-state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Offline,
    Connected,
    /// Lost the authority; snapshot and audio are held as-is.
    Holding,
}

/// Edge produced by [`ConnectionTracker::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTransition {
    Connected,
    Reconnected,
    Lost { reason: Option<String> },
}

/// Edge detector over raw [`ConnectionSignal`]s.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
}

impl ConnectionTracker {
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Applies a signal, returning the transition if the state actually changed.
    pub fn observe(&mut self, signal: ConnectionSignal) -> Option<ConnectionTransition> {
        match (self.state, signal) {
            (ConnectionState::Connected, ConnectionSignal::Connected) => None,
            (ConnectionState::Offline, ConnectionSignal::Connected) => {
                self.state = ConnectionState::Connected;
                Some(ConnectionTransition::Connected)
            }
            (ConnectionState::Holding, ConnectionSignal::Connected) => {
                self.state = ConnectionState::Connected;
                Some(ConnectionTransition::Reconnected)
            }
            (ConnectionState::Connected, ConnectionSignal::Disconnected { reason }) => {
                self.state = ConnectionState::Holding;
                Some(ConnectionTransition::Lost { reason })
            }
            (_, ConnectionSignal::Disconnected { .. }) => None,
        }
    }
}
