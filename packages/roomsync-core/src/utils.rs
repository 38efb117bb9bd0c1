//! General utilities shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Source of wall-clock time in epoch milliseconds.
///
/// The authority expresses synchronized starts as wall-clock instants, so the
/// scheduler needs "now" on the same scale. Device clocks are assumed to be
/// loosely synchronized; no skew correction happens here.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time in epoch milliseconds.
    fn now_millis(&self) -> u64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        now_millis()
    }
}

/// Fixed clock that only moves when told to.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now
            .fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Position Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Clamps a seek target to `[0, duration]`.
///
/// Without a known duration only the lower bound applies. Non-finite input
/// collapses to 0.
#[must_use]
pub fn clamp_position(position_secs: f64, duration_secs: Option<f64>) -> f64 {
    if !position_secs.is_finite() {
        return 0.0;
    }
    let lower = position_secs.max(0.0);
    match duration_secs {
        Some(d) if d.is_finite() && d >= 0.0 => lower.min(d),
        _ => lower,
    }
}
