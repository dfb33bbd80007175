//! Application state wiring the configured draft store.
//!
//! The store is type-erased behind `BoxDraftStore` so the storage mode can be
//! chosen from config or `--storage` at runtime, and swapped mid-session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gutachtomat_core::autosave::SignalBus;
use gutachtomat_core::storage::BoxDraftStore;
use gutachtomat_infra::config::load_config;
use gutachtomat_infra::crypto::DraftCipher;
use gutachtomat_infra::filesystem::{key_file_path, resolve_data_dir};
use gutachtomat_infra::local::LocalDraftStore;
use gutachtomat_infra::sqlite::pool::default_database_url;
use gutachtomat_infra::sqlite::{DatabaseDraftStore, DatabasePool};
use gutachtomat_types::config::GutachtomatConfig;
use gutachtomat_types::storage::StorageMode;

/// Environment variable holding an optional encryption passphrase.
const PASSPHRASE_ENV: &str = "GUTACHTOMAT_PASSPHRASE";

/// Shared state for all commands.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: GutachtomatConfig,
    pub storage_mode: StorageMode,
    pub store: Arc<BoxDraftStore>,
    pub signals: SignalBus,
    cipher: DraftCipher,
}

impl AppState {
    /// Resolve the data directory, load config, and open the draft store.
    pub async fn init(storage_override: Option<StorageMode>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let storage_mode = storage_override.unwrap_or(config.storage_mode);

        let cipher = match std::env::var(PASSPHRASE_ENV) {
            Ok(passphrase) if !passphrase.is_empty() => DraftCipher::from_passphrase(&passphrase)?,
            _ => DraftCipher::from_key_file(&key_file_path(&data_dir)).await?,
        };

        let store = connect_store(&data_dir, &config, &cipher, storage_mode).await?;
        let state = Self {
            data_dir,
            config,
            storage_mode,
            store,
            signals: SignalBus::default(),
            cipher,
        };

        tracing::debug!(
            data_dir = %state.data_dir.display(),
            storage_mode = %storage_mode,
            backend = state.store.backend(),
            "application state ready"
        );
        Ok(state)
    }

    /// Open the draft store for `mode`, e.g. when switching mid-session.
    pub async fn open_store(&self, mode: StorageMode) -> anyhow::Result<Arc<BoxDraftStore>> {
        connect_store(&self.data_dir, &self.config, &self.cipher, mode).await
    }
}

async fn connect_store(
    data_dir: &Path,
    config: &GutachtomatConfig,
    cipher: &DraftCipher,
    mode: StorageMode,
) -> anyhow::Result<Arc<BoxDraftStore>> {
    let store = match mode {
        StorageMode::Local => {
            BoxDraftStore::new(LocalDraftStore::new(data_dir, cipher.clone()), "local")
        }
        StorageMode::Cloud => {
            let url = config
                .database_url
                .clone()
                .unwrap_or_else(|| default_database_url(data_dir));
            let pool = DatabasePool::new(&url).await?;
            BoxDraftStore::new(DatabaseDraftStore::new(pool, cipher.clone()), "database")
        }
    };
    Ok(Arc::new(store))
}
