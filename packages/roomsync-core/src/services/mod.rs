//! Engine services layer.
//!
//! - [`sync_engine`]: the reconciliation state machine and its handle
//! - [`play_scheduler`]: latency-compensated, cancellable start timer
//! - [`load_retry`]: classified retry policy for failed loads
//! - [`latency_registry`]: per-zone output latency

pub mod latency_registry;
pub mod load_retry;
pub mod play_scheduler;
pub mod sync_engine;

pub use latency_registry::LatencyRegistry;
pub use load_retry::{LoadRetryPolicy, RetryDecision};
pub use play_scheduler::{
    compensated_delay, PendingScheduledAction, PlayScheduler, ScheduleOutcome, ScheduledAction,
};
pub use sync_engine::{spawn_engine, EngineDeps, EngineHandle, LocalIntent, SnapshotView, SyncState};
