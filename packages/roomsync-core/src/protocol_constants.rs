//! Fixed protocol constants shared with the playback authority.
//!
//! Event names are part of the wire contract with the server and must not be
//! changed independently of it.

// ─────────────────────────────────────────────────────────────────────────────
// Inbound Event Names
// ─────────────────────────────────────────────────────────────────────────────

/// Full authoritative snapshot, sent on connect and on resume.
pub const EVENT_PLAYBACK_STATE: &str = "playback_state";

/// The authority switched to a different track.
pub const EVENT_TRACK_CHANGED: &str = "track_changed";

/// Synchronized start: begin playback at a wall-clock instant.
pub const EVENT_SYNC_PLAY: &str = "sync_play";

/// Synchronized pause at a position.
pub const EVENT_SYNC_PAUSE: &str = "sync_pause";

/// Synchronized seek to a position.
pub const EVENT_SYNC_SEEK: &str = "sync_seek";

/// Periodic position tick. Never triggers audio side effects.
pub const EVENT_POSITION_UPDATE: &str = "position_update";

// ─────────────────────────────────────────────────────────────────────────────
// Outbound Intent Names
// ─────────────────────────────────────────────────────────────────────────────

pub const INTENT_PLAY: &str = "play";
pub const INTENT_PAUSE: &str = "pause";
pub const INTENT_NEXT_TRACK: &str = "next_track";
pub const INTENT_PREVIOUS_TRACK: &str = "previous_track";
pub const INTENT_SEEK: &str = "seek";

/// Natural end of a track, emitted exactly once per load.
pub const INTENT_TRACK_COMPLETED: &str = "track_completed";

// ─────────────────────────────────────────────────────────────────────────────
// Engine Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Backoff before the single retry of a failed local-file load (milliseconds).
///
/// Local-file endpoints may not be warmed up server-side right after a track
/// change; two seconds was found to be enough in practice.
pub const LOCAL_FILE_RETRY_DELAY_MS: u64 = 2000;

/// Number of retries granted to a failed local-file load.
pub const LOCAL_FILE_MAX_RETRIES: u32 = 1;

/// Local position may deviate this much from the authority before a
/// same-track event forces a corrective seek (milliseconds).
pub const DRIFT_TOLERANCE_MS: u64 = 1500;

/// After this long without the authority the snapshot is flagged stale (seconds).
pub const STALE_AFTER_SECS: u64 = 30;

/// Capacity of the UI event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Resume restores the captured pause position when the live resource has
/// drifted from it by more than this (seconds).
pub const RESUME_POSITION_EPSILON_SECS: f64 = 0.05;
