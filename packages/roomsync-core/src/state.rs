//! Engine configuration and persisted zone latency settings.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DRIFT_TOLERANCE_MS, EVENT_CHANNEL_CAPACITY, LOCAL_FILE_MAX_RETRIES, LOCAL_FILE_RETRY_DELAY_MS,
    STALE_AFTER_SECS,
};

/// Configuration for the synchronization engine.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Zone this device plays into. Its delay is subtracted from every
    /// synchronized start. `None` means no compensation.
    pub output_zone: Option<String>,

    // Load retry
    /// Backoff before retrying a failed local-file load (milliseconds).
    pub local_file_retry_delay_ms: u64,

    /// Number of retries for a failed local-file load.
    pub local_file_max_retries: u32,

    // Reconciliation
    /// Same-track events only seek when local position deviates by more than this (milliseconds).
    pub drift_tolerance_ms: u64,

    /// Seconds without the authority before the snapshot is flagged stale.
    pub stale_after_secs: u64,

    /// Capacity of the UI event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_zone: None,
            local_file_retry_delay_ms: LOCAL_FILE_RETRY_DELAY_MS,
            local_file_max_retries: LOCAL_FILE_MAX_RETRIES,
            drift_tolerance_ms: DRIFT_TOLERANCE_MS,
            stale_after_secs: STALE_AFTER_SECS,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.stale_after_secs == 0 {
            return Err("stale_after_secs must be >= 1".to_string());
        }
        if self.local_file_max_retries > 0 && self.local_file_retry_delay_ms == 0 {
            return Err("local_file_retry_delay_ms must be >= 1 when retries are enabled".to_string());
        }
        if matches!(self.output_zone.as_deref(), Some(zone) if zone.trim().is_empty()) {
            return Err("output_zone must not be blank".to_string());
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Zone Latency Configuration (persisted)
// ─────────────────────────────────────────────────────────────────────────────

const ZONE_LATENCY_FILE: &str = "zone_latency.json";

/// Global mutex to serialize all zone latency file operations.
static CONFIG_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn config_lock() -> &'static Mutex<()> {
    CONFIG_LOCK.get_or_init(|| Mutex::new(()))
}

/// Output latency of one zone.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneLatency {
    /// Time between issuing a play command and audio leaving the speaker.
    pub delay_ms: u64,
    /// Inactive zones are never compensated.
    pub active: bool,
}

impl Default for ZoneLatency {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            active: true,
        }
    }
}

/// Persisted per-zone latency settings, keyed by zone name.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ZoneLatencyConfig {
    pub zones: BTreeMap<String, ZoneLatency>,
}

impl ZoneLatencyConfig {
    /// Loads zone latency configuration from the data directory.
    ///
    /// Returns default (empty) config if file doesn't exist or is invalid.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(ZONE_LATENCY_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!(
                    "[ZoneLatency] Ignoring unreadable {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Saves zone latency configuration to the data directory.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption on crash.
    /// Creates the directory if it doesn't exist.
    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(ZONE_LATENCY_FILE);
        let temp_path = data_dir.join("zone_latency.json.tmp");
        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &path)
    }

    /// Atomically sets one zone's latency in the config file.
    ///
    /// Skips the disk write when the stored value is already equal.
    pub fn set_zone_atomic(data_dir: &Path, zone: &str, latency: ZoneLatency) -> std::io::Result<()> {
        let _guard = config_lock().lock();
        let mut config = Self::load(data_dir);
        if config.zones.get(zone) != Some(&latency) {
            config.zones.insert(zone.to_string(), latency);
            config.save(data_dir)?;
        }
        Ok(())
    }

    /// Atomically removes a zone from the config file. Idempotent.
    pub fn remove_zone_atomic(data_dir: &Path, zone: &str) -> std::io::Result<()> {
        let _guard = config_lock().lock();
        let mut config = Self::load(data_dir);
        if config.zones.remove(zone).is_some() {
            config.save(data_dir)?;
        }
        Ok(())
    }
}
