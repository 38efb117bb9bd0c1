//! Bridge implementation that maps engine events to a broadcast channel.
//!
//! The [`BroadcastEventBridge`] lives at the boundary between the engine and
//! UI delivery, mapping typed events onto a `tokio::sync::broadcast` channel
//! that any number of UI subscribers can follow.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{ClientEvent, ConnectionEvent, LatencyEvent, PlaybackEvent};

/// Bridges engine events to a broadcast channel.
///
/// For host-specific delivery (e.g., a mobile UI thread), the bridge also
/// forwards to an optional external emitter that can be set after construction.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
/// The external emitter uses `RwLock` to allow setting it after construction.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<ClientEvent>,
    /// Optional external emitter for host-specific event delivery
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter for host-specific event delivery.
    ///
    /// Can be called after construction, which is useful when the host
    /// handle isn't available until later.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

/// Generates an [`EventEmitter`] method that forwards to the external emitter
/// (if set) and then sends to the broadcast channel.
macro_rules! impl_emit {
    ($method:ident, $event_ty:ty, $variant:ident) => {
        fn $method(&self, event: $event_ty) {
            if let Some(ref emitter) = *self.external_emitter.read() {
                emitter.$method(event.clone());
            }
            if let Err(e) = self.tx.send(ClientEvent::$variant(event)) {
                log::trace!("[EventBridge] No broadcast receivers: {}", e);
            }
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_playback, PlaybackEvent, Playback);
    impl_emit!(emit_connection, ConnectionEvent, Connection);
    impl_emit!(emit_latency, LatencyEvent, Latency);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingEmitter {
        connection: Mutex<Vec<ConnectionEvent>>,
    }

    impl EventEmitter for CapturingEmitter {
        fn emit_playback(&self, _event: PlaybackEvent) {}

        fn emit_connection(&self, event: ConnectionEvent) {
            self.connection.lock().push(event);
        }

        fn emit_latency(&self, _event: LatencyEvent) {}
    }

    #[test]
    fn forwards_to_subscribers_and_external_emitter() {
        let bridge = BroadcastEventBridge::new(8);
        let mut rx = bridge.subscribe();
        let external = Arc::new(CapturingEmitter::default());
        bridge.set_external_emitter(external.clone());

        bridge.emit_connection(ConnectionEvent::Connected { timestamp: 3 });

        match rx.try_recv().unwrap() {
            ClientEvent::Connection(ConnectionEvent::Connected { timestamp }) => {
                assert_eq!(timestamp, 3)
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            *external.connection.lock(),
            vec![ConnectionEvent::Connected { timestamp: 3 }]
        );
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let bridge = BroadcastEventBridge::new(8);
        bridge.emit_latency(LatencyEvent::ZoneRemoved {
            zone: "kitchen".into(),
            timestamp: 0,
        });
    }
}
