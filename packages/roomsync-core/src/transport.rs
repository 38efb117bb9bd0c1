//! Outbound intent delivery.
//!
//! The engine never waits on the authority: intents are handed to a
//! [`TransportSink`] and the resulting state change arrives later as an
//! ordinary remote event.

use tokio::sync::mpsc;

use crate::protocol::OutboundIntent;

/// Fire-and-forget sink for intents addressed to the authority.
pub trait TransportSink: Send + Sync {
    /// Sends an intent. Must not block; delivery failures are the sink's concern.
    fn send(&self, intent: OutboundIntent);
}

/// Sink that forwards intents into an unbounded channel.
///
/// Used by adapters that own the actual socket and drain the receiver.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundIntent>,
}

impl ChannelTransport {
    /// Creates a sink and the receiver the adapter drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundIntent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransportSink for ChannelTransport {
    fn send(&self, intent: OutboundIntent) {
        if let Err(e) = self.tx.send(intent) {
            log::debug!("[Transport] Receiver gone, dropping {}", e.0.name());
        }
    }
}

/// Sink that only logs. Useful when running without an authority.
pub struct LoggingTransport;

impl TransportSink for LoggingTransport {
    fn send(&self, intent: OutboundIntent) {
        log::info!("[Transport] -> {} {}", intent.name(), intent.payload());
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Sink that keeps every intent for inspection.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        sent: Arc<Mutex<Vec<OutboundIntent>>>,
    }

    impl RecordingTransport {
        pub fn sent(&self) -> Vec<OutboundIntent> {
            self.sent.lock().clone()
        }
    }

    impl TransportSink for RecordingTransport {
        fn send(&self, intent: OutboundIntent) {
            self.sent.lock().push(intent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_delivers_in_order() {
        let (sink, mut rx) = ChannelTransport::new();
        sink.send(OutboundIntent::Pause);
        sink.send(OutboundIntent::Seek { position: 3.0 });

        assert_eq!(rx.recv().await, Some(OutboundIntent::Pause));
        assert_eq!(rx.recv().await, Some(OutboundIntent::Seek { position: 3.0 }));
    }

    #[test]
    fn channel_transport_tolerates_closed_receiver() {
        let (sink, rx) = ChannelTransport::new();
        drop(rx);
        sink.send(OutboundIntent::Play);
    }
}
