//! Configuration loader for Gutachtomat.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`GutachtomatConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::Path;

use gutachtomat_types::config::GutachtomatConfig;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults, logged at debug level.
/// - Unreadable or unparsable file: defaults, logged as a warning.
pub async fn load_config(data_dir: &Path) -> GutachtomatConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GutachtomatConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GutachtomatConfig::default();
        }
    };

    match toml::from_str::<GutachtomatConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GutachtomatConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gutachtomat_types::storage::StorageMode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.storage_mode, StorageMode::Local);
        assert_eq!(config.autosave.local_interval_ms, 5_000);
        assert_eq!(config.autosave.cloud_interval_ms, 60_000);
        assert!(config.database_url.is_none());
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
storage_mode = "cloud"
database_url = "sqlite:///var/lib/gutachtomat/drafts.db"

[autosave]
cloud_interval_ms = 30000
save_timeout_secs = 0
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.storage_mode, StorageMode::Cloud);
        assert_eq!(config.autosave.cloud_interval_ms, 30_000);
        assert_eq!(config.autosave.local_interval_ms, 5_000);
        assert_eq!(config.autosave.save_timeout(), None);
        assert_eq!(
            config.database_url.as_deref(),
            Some("sqlite:///var/lib/gutachtomat/drafts.db")
        );
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "storage_mode = [")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.storage_mode, StorageMode::Local);
    }

    #[tokio::test]
    async fn unknown_storage_mode_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "storage_mode = \"ftp\"\n")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.storage_mode, StorageMode::Local);
    }
}
