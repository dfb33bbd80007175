//! Storage backend selection.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which backend drafts are persisted to.
///
/// The mode also sets the autosave cadence: local writes are cheap and run
/// often, cloud writes go over the network and are spaced out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Encrypted files on this device.
    #[default]
    Local,
    /// Encrypted rows in the shared database.
    Cloud,
}

impl StorageMode {
    /// Autosave check interval when no override is configured.
    pub fn default_save_interval(&self) -> Duration {
        match self {
            StorageMode::Local => Duration::from_millis(5_000),
            StorageMode::Cloud => Duration::from_millis(60_000),
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Local => write!(f, "local"),
            StorageMode::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "cloud" => Ok(StorageMode::Cloud),
            other => Err(format!("invalid storage mode: '{other}' (expected 'local' or 'cloud')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        assert_eq!(
            StorageMode::Local.default_save_interval(),
            Duration::from_secs(5)
        );
        assert_eq!(
            StorageMode::Cloud.default_save_interval(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Cloud".parse::<StorageMode>().unwrap(), StorageMode::Cloud);
        assert_eq!(" local ".parse::<StorageMode>().unwrap(), StorageMode::Local);
        assert!("remote".parse::<StorageMode>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&StorageMode::Cloud).unwrap();
        assert_eq!(json, "\"cloud\"");
        let parsed: StorageMode = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(parsed, StorageMode::Local);
    }

    #[test]
    fn test_display_matches_parse() {
        for mode in [StorageMode::Local, StorageMode::Cloud] {
            assert_eq!(mode.to_string().parse::<StorageMode>().unwrap(), mode);
        }
    }
}
