//! Client configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use roomsync_core::EngineConfig;
use serde::Deserialize;

/// Client configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Zone this device plays into.
    /// Override: `ROOMSYNC_OUTPUT_ZONE`
    pub output_zone: Option<String>,

    /// Length of every simulated track in seconds. Unset means tracks never end.
    /// Override: `ROOMSYNC_TRACK_DURATION_SECS`
    pub track_duration_secs: Option<u64>,

    /// Backoff before retrying a failed local-file load.
    pub local_file_retry_delay_ms: u64,

    /// Retries for a failed local-file load.
    pub local_file_max_retries: u32,

    /// Same-track events only seek beyond this deviation.
    /// Override: `ROOMSYNC_DRIFT_TOLERANCE_MS`
    pub drift_tolerance_ms: u64,

    /// Seconds without the authority before the snapshot is flagged stale.
    /// Override: `ROOMSYNC_STALE_AFTER_SECS`
    pub stale_after_secs: u64,

    /// Keep running after the input ends, until Ctrl+C.
    pub keep_alive: bool,

    /// Directory for persistent data (zone latency).
    /// Override: `ROOMSYNC_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            output_zone: None,
            track_duration_secs: None,
            local_file_retry_delay_ms: engine.local_file_retry_delay_ms,
            local_file_max_retries: engine.local_file_max_retries,
            drift_tolerance_ms: engine.drift_tolerance_ms,
            stale_after_secs: engine.stale_after_secs,
            keep_alive: false,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROOMSYNC_OUTPUT_ZONE") {
            if !val.is_empty() {
                self.output_zone = Some(val);
            }
        }

        if let Ok(val) = std::env::var("ROOMSYNC_TRACK_DURATION_SECS") {
            if let Ok(secs) = val.parse() {
                self.track_duration_secs = Some(secs);
            }
        }

        if let Ok(val) = std::env::var("ROOMSYNC_DRIFT_TOLERANCE_MS") {
            if let Ok(ms) = val.parse() {
                self.drift_tolerance_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("ROOMSYNC_STALE_AFTER_SECS") {
            if let Ok(secs) = val.parse() {
                self.stale_after_secs = secs;
            }
        }

        // Note: ROOMSYNC_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to roomsync-core's EngineConfig type.
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            output_zone: self.output_zone.clone(),
            local_file_retry_delay_ms: self.local_file_retry_delay_ms,
            local_file_max_retries: self.local_file_max_retries,
            drift_tolerance_ms: self.drift_tolerance_ms,
            stale_after_secs: self.stale_after_secs,
            ..Default::default()
        }
    }
}
