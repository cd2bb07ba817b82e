//! Runtime configuration and its on-disk JSON form
//!
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written config behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Per-lane drive budget used when none is configured
pub const DEFAULT_TICK_BUDGET_MS: u64 = 25;

/// Forced-drain pass cap used when none is configured
pub const DEFAULT_FORCE_DRAIN_PASSES: usize = 20;

/// Configuration for the tickwork runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Wall-clock budget for each queue's drive pass within one tick
    pub tick_budget_ms: u64,

    /// Maximum forced passes during shutdown before leftovers are discarded
    pub force_drain_passes: usize,

    /// Name of the background worker thread
    pub worker_thread_name: String,

    /// Bound on the worker queue; `None` means unbounded
    pub worker_queue_capacity: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_budget_ms: DEFAULT_TICK_BUDGET_MS,
            force_drain_passes: DEFAULT_FORCE_DRAIN_PASSES,
            worker_thread_name: "tickwork-async".to_string(),
            worker_queue_capacity: None,
        }
    }
}

impl RuntimeConfig {
    /// Drive budget as a duration
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms)
    }

    /// Reject values the scheduler cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_budget_ms == 0 {
            return Err(ConfigError::ZeroTickBudget);
        }
        if self.force_drain_passes == 0 {
            return Err(ConfigError::ZeroDrainPasses);
        }
        if self.worker_queue_capacity == Some(0) {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// Write data atomically to a file
///
/// Creates a temporary file, writes the data, syncs, then renames
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    file.write_all(data).context("Failed to write data")?;
    file.sync_all().context("Failed to sync file")?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let dir = OpenOptions::new()
            .read(true)
            .open(parent)
            .with_context(|| format!("Failed to open directory: {:?}", parent))?;
        dir.sync_all().context("Failed to sync directory")?;
    }

    Ok(())
}

/// Write runtime configuration
pub fn write_config(path: &Path, config: &RuntimeConfig) -> Result<()> {
    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    write_atomic(path, &json)
}

/// Load and validate runtime configuration
pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let data = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let config: RuntimeConfig =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {:?}", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.tick_budget(), Duration::from_millis(25));
        assert_eq!(config.force_drain_passes, 20);
        assert!(config.worker_queue_capacity.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let config = RuntimeConfig {
            tick_budget_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTickBudget)));

        let config = RuntimeConfig {
            force_drain_passes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDrainPasses)));

        let config = RuntimeConfig {
            worker_queue_capacity: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroQueueCapacity)));
    }

    #[test]
    fn test_write_and_read_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tickwork.json");

        let config = RuntimeConfig {
            tick_budget_ms: 40,
            force_drain_passes: 5,
            worker_thread_name: "io".to_string(),
            worker_queue_capacity: Some(64),
        };

        write_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.json");
        fs::write(&path, br#"{ "tick_budget_ms": 10 }"#).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.tick_budget_ms, 10);
        assert_eq!(loaded.force_drain_passes, DEFAULT_FORCE_DRAIN_PASSES);
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, br#"{ "force_drain_passes": 0 }"#).unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("force_drain_passes"));
    }
}
