//! Global configuration types for Gutachtomat.
//!
//! `GutachtomatConfig` represents the `config.toml` in the data directory
//! that selects the storage backend and tunes autosave timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::StorageMode;

/// Top-level configuration.
///
/// Loaded from `~/.gutachtomat/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GutachtomatConfig {
    /// Backend drafts are written to.
    #[serde(default)]
    pub storage_mode: StorageMode,

    /// Autosave cadence and timeout.
    #[serde(default)]
    pub autosave: AutosaveConfig,

    /// Database URL for cloud mode. Defaults to a SQLite file in the data dir.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Autosave tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Check interval in local mode (milliseconds).
    #[serde(default = "default_local_interval_ms")]
    pub local_interval_ms: u64,

    /// Check interval in cloud mode (milliseconds).
    #[serde(default = "default_cloud_interval_ms")]
    pub cloud_interval_ms: u64,

    /// Upper bound on a single storage write. `0` disables the timeout.
    #[serde(default = "default_save_timeout_secs")]
    pub save_timeout_secs: u64,
}

fn default_local_interval_ms() -> u64 {
    5_000
}

fn default_cloud_interval_ms() -> u64 {
    60_000
}

fn default_save_timeout_secs() -> u64 {
    30
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            local_interval_ms: default_local_interval_ms(),
            cloud_interval_ms: default_cloud_interval_ms(),
            save_timeout_secs: default_save_timeout_secs(),
        }
    }
}

impl AutosaveConfig {
    /// Check interval for the given storage mode. A zero value falls back to
    /// the mode's default.
    pub fn interval_for(&self, mode: StorageMode) -> Duration {
        let ms = match mode {
            StorageMode::Local => self.local_interval_ms,
            StorageMode::Cloud => self.cloud_interval_ms,
        };
        if ms == 0 {
            mode.default_save_interval()
        } else {
            Duration::from_millis(ms)
        }
    }

    /// Save timeout, or `None` when disabled.
    pub fn save_timeout(&self) -> Option<Duration> {
        (self.save_timeout_secs > 0).then(|| Duration::from_secs(self.save_timeout_secs))
    }
}
