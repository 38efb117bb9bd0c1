//! RoomSync Core - client-side synchronization engine for multi-room playback.
//!
//! A single authoritative server broadcasts a shared playback timeline to many
//! output devices, each with its own audio pipeline latency. This crate is
//! the piece that runs on every device: it reconciles the authority's events
//! with one local audio resource and issues synchronized starts early by the
//! device's known output latency.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`events`]: UI notifications (playback, connection, latency)
//! - [`audio`]: Audio backend seam and the single-resource controller
//! - [`services`]: Reconciliation engine, start scheduler, retry policy, latency registry
//! - [`protocol`]: Wire decoding of remote events and encoding of intents
//! - [`state`]: Engine configuration and persisted zone latency
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from platform-specific
//! implementations:
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting UI events
//! - [`AudioBackend`](audio::AudioBackend): Opening platform audio resources
//! - [`TransportSink`](transport::TransportSink): Delivering intents to the authority
//! - [`ConnectionLifecycle`](lifecycle::ConnectionLifecycle): Feeding connection state and events in
//! - [`Clock`](utils::Clock): Wall-clock time for scheduling
//!
//! Each trait has a default implementation suitable for the headless client.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod audio;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod protocol;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types at the crate root
pub use audio::{
    AudioBackend, AudioError, AudioNotice, AudioNotifier, AudioOutput, AudioResult,
    AudioSessionHandle, AudioState, SimulatedAudioBackend,
};
pub use error::{ErrorCode, SyncError, SyncResult};
pub use events::{
    BroadcastEventBridge, ClientEvent, ConnectionEvent, EventEmitter, LatencyEvent,
    LoggingEventEmitter, NoopEventEmitter, PlaybackEvent,
};
pub use lifecycle::{ConnectionLifecycle, ConnectionSignal, ConnectionState};
pub use protocol::{OutboundIntent, ProtocolError, RemoteEvent};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{EngineConfig, ZoneLatency, ZoneLatencyConfig};
pub use transport::{ChannelTransport, LoggingTransport, TransportSink};
pub use types::{PlaybackSnapshot, RepeatMode, SourceKind, TrackRef};
pub use utils::{now_millis, Clock, SystemClock};

// Re-export service types
pub use services::{
    EngineHandle, LatencyRegistry, LocalIntent, PendingScheduledAction, SnapshotView, SyncState,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_engine, AudioBackendChoice, BootstrapOptions, BootstrappedEngine};
