//! Latency-compensated scheduling of synchronized starts.
//!
//! The authority says "audio must be heard at wall-clock T". This device's
//! output zone needs `delayMs` between the play command and audible sound,
//! so the local command is issued at `T - delayMs`:
//!
//! ```text
//! fire_delay = max(0, (start_time - now) - delay_ms)
//! ```
//!
//! Only one play-start is ever pending. Scheduling a new one cancels the old
//! one synchronously before the new timer exists, and the fire path re-checks
//! the generation, so a timer that raced its own cancellation is a no-op.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::runtime::TaskSpawner;
use crate::utils::Clock;

/// Delay before issuing a local command so that audio lands at `start_time_ms`.
///
/// Zero when the compensated instant is already past: a late start beats a
/// dropped one.
#[must_use]
pub fn compensated_delay(start_time_ms: u64, now_ms: u64, zone_delay_ms: u64) -> Duration {
    Duration::from_millis(
        start_time_ms
            .saturating_sub(now_ms)
            .saturating_sub(zone_delay_ms),
    )
}

/// Class of deferred action. Each class has at most one pending instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduledAction {
    StartPlayback,
}

/// The single pending deferred action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingScheduledAction {
    /// Wall-clock instant (epoch ms) the local command is due.
    pub fire_at_ms: u64,
    pub action: ScheduledAction,
    pub generation: u64,
}

/// Result of [`PlayScheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Already due; the caller acts now. Nothing is left pending.
    Immediate { generation: u64 },
    /// A timer was armed and will report `generation` when it fires.
    Deferred { generation: u64, fire_in: Duration },
}

/// Callback invoked from the timer task with the fired generation.
pub type FireCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Owner of the pending play-start timer.
pub struct PlayScheduler {
    clock: Arc<dyn Clock>,
    spawner: Arc<dyn TaskSpawner>,
    on_fire: FireCallback,
    generation: u64,
    pending: Option<(PendingScheduledAction, CancellationToken)>,
}

impl PlayScheduler {
    pub fn new(clock: Arc<dyn Clock>, spawner: Arc<dyn TaskSpawner>, on_fire: FireCallback) -> Self {
        Self {
            clock,
            spawner,
            on_fire,
            generation: 0,
            pending: None,
        }
    }

    /// The pending action, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingScheduledAction> {
        self.pending.as_ref().map(|(p, _)| p)
    }

    /// Schedules a play-start for `start_time_ms`, superseding any pending one.
    pub fn schedule(&mut self, start_time_ms: u64, zone_delay_ms: u64) -> ScheduleOutcome {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let now = self.clock.now_millis();
        let fire_in = compensated_delay(start_time_ms, now, zone_delay_ms);
        if fire_in.is_zero() {
            log::info!(
                "[PlayScheduler] Start {}ms late (zone delay {}ms), firing now (gen={})",
                now.saturating_sub(start_time_ms),
                zone_delay_ms,
                generation
            );
            return ScheduleOutcome::Immediate { generation };
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let on_fire = Arc::clone(&self.on_fire);
        self.spawner.spawn(Box::pin(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(fire_in) => on_fire(generation),
            }
        }));

        let fire_at_ms = now + fire_in.as_millis() as u64;
        log::debug!(
            "[PlayScheduler] Start armed in {}ms (zone delay {}ms, gen={})",
            fire_in.as_millis(),
            zone_delay_ms,
            generation
        );
        self.pending = Some((
            PendingScheduledAction {
                fire_at_ms,
                action: ScheduledAction::StartPlayback,
                generation,
            },
            token,
        ));
        ScheduleOutcome::Deferred {
            generation,
            fire_in,
        }
    }

    /// Claims the pending action for a fired timer.
    ///
    /// Returns `None` if `generation` was superseded or cancelled.
    pub fn take_due(&mut self, generation: u64) -> Option<PendingScheduledAction> {
        match &self.pending {
            Some((pending, _)) if pending.generation == generation => {
                self.pending.take().map(|(pending, _)| pending)
            }
            _ => {
                log::debug!("[PlayScheduler] Dropping stale fire (gen={})", generation);
                None
            }
        }
    }

    /// Cancels the pending action. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((pending, token)) => {
                token.cancel();
                log::debug!("[PlayScheduler] Cancelled start (gen={})", pending.generation);
                true
            }
            None => false,
        }
    }
}

impl Drop for PlayScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
