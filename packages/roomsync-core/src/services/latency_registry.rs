//! Per-zone output latency registry.
//!
//! Pure data plus accessors. The engine asks for the compensation of its
//! output zone at the moment it schedules a start; configuration changes
//! come in through explicit calls only and are persisted when a data
//! directory is configured.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::SyncResult;
use crate::events::{EventEmitter, LatencyEvent};
use crate::state::{ZoneLatency, ZoneLatencyConfig};
use crate::utils::now_millis;

/// Concurrent map of zone name to [`ZoneLatency`].
pub struct LatencyRegistry {
    zones: DashMap<String, ZoneLatency>,
    emitter: Arc<dyn EventEmitter>,
    data_dir: Option<PathBuf>,
}

impl LatencyRegistry {
    /// Creates an empty, in-memory registry.
    pub fn new(emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            zones: DashMap::new(),
            emitter,
            data_dir: None,
        }
    }

    /// Creates a registry backed by `zone_latency.json` in `data_dir`.
    pub fn load(data_dir: PathBuf, emitter: Arc<dyn EventEmitter>) -> Self {
        let config = ZoneLatencyConfig::load(&data_dir);
        log::info!(
            "[LatencyRegistry] Loaded {} zone(s) from {}",
            config.zones.len(),
            data_dir.display()
        );
        Self {
            zones: config.zones.into_iter().collect(),
            emitter,
            data_dir: Some(data_dir),
        }
    }

    #[must_use]
    pub fn get(&self, zone: &str) -> Option<ZoneLatency> {
        self.zones.get(zone).map(|entry| *entry.value())
    }

    /// Sets a zone's delay, creating the zone (active) if unknown.
    pub fn set_delay(&self, zone: &str, delay_ms: u64) -> SyncResult<()> {
        let mut latency = self.get(zone).unwrap_or_default();
        latency.delay_ms = delay_ms;
        self.store(zone, latency)
    }

    /// Marks a zone active or inactive, creating it (zero delay) if unknown.
    pub fn set_active(&self, zone: &str, active: bool) -> SyncResult<()> {
        let mut latency = self.get(zone).unwrap_or_default();
        latency.active = active;
        self.store(zone, latency)
    }

    /// Removes a zone. Returns true if it existed.
    pub fn remove(&self, zone: &str) -> SyncResult<bool> {
        if self.zones.remove(zone).is_none() {
            return Ok(false);
        }
        if let Some(dir) = &self.data_dir {
            ZoneLatencyConfig::remove_zone_atomic(dir, zone)?;
        }
        self.emitter.emit_latency(LatencyEvent::ZoneRemoved {
            zone: zone.to_string(),
            timestamp: now_millis(),
        });
        Ok(true)
    }

    /// Delay to subtract for `zone`: 0 when unset, unknown, or inactive.
    #[must_use]
    pub fn compensation_ms(&self, zone: Option<&str>) -> u64 {
        zone.and_then(|z| self.get(z))
            .filter(|latency| latency.active)
            .map_or(0, |latency| latency.delay_ms)
    }

    /// Snapshot of the registry in its persisted shape.
    #[must_use]
    pub fn to_config(&self) -> ZoneLatencyConfig {
        ZoneLatencyConfig {
            zones: self
                .zones
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }

    fn store(&self, zone: &str, latency: ZoneLatency) -> SyncResult<()> {
        if self.get(zone) == Some(latency) {
            return Ok(());
        }
        if let Some(dir) = &self.data_dir {
            ZoneLatencyConfig::set_zone_atomic(dir, zone, latency)?;
        }
        self.zones.insert(zone.to_string(), latency);
        log::info!(
            "[LatencyRegistry] {} -> {}ms ({})",
            zone,
            latency.delay_ms,
            if latency.active { "active" } else { "inactive" }
        );
        self.emitter.emit_latency(LatencyEvent::ZoneUpdated {
            zone: zone.to_string(),
            delay_ms: latency.delay_ms,
            active: latency.active,
            timestamp: now_millis(),
        });
        Ok(())
    }
}
