//! Local (file-based) implementation of `DraftStore`.
//!
//! Each draft lives in `{data_dir}/drafts/{id}.json`: a JSON envelope with
//! plaintext listing metadata and the encrypted payload as base64. Writes go
//! to a temporary file in the same directory and are renamed into place, so a
//! crash mid-save leaves the previous version intact.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gutachtomat_core::storage::DraftStore;
use gutachtomat_types::draft::{Draft, DraftId, DraftSummary, FormData, WizardState};
use gutachtomat_types::error::StorageError;

use crate::crypto::{DraftCipher, payload};

/// Envelope format version written by this store.
const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DraftEnvelope {
    version: u32,
    id: DraftId,
    current_step: u32,
    field_count: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Base64 of `nonce || ciphertext`.
    payload: String,
}

impl DraftEnvelope {
    fn summary(&self) -> DraftSummary {
        DraftSummary {
            id: self.id,
            current_step: self.current_step,
            field_count: self.field_count,
            updated_at: self.updated_at,
        }
    }
}

/// Encrypted per-file draft persistence.
#[derive(Debug)]
pub struct LocalDraftStore {
    drafts_dir: PathBuf,
    cipher: DraftCipher,
}

impl LocalDraftStore {
    /// Create a store rooted at `{data_dir}/drafts`. The directory is created
    /// lazily on first save.
    pub fn new(data_dir: &Path, cipher: DraftCipher) -> Self {
        Self {
            drafts_dir: data_dir.join("drafts"),
            cipher,
        }
    }

    /// Path of the file holding draft `id`.
    pub fn draft_path(&self, id: &DraftId) -> PathBuf {
        self.drafts_dir.join(format!("{id}.json"))
    }

    async fn read_envelope(&self, path: &Path) -> Result<Option<DraftEnvelope>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.drafts_dir).await?;

        let tmp_path = self
            .drafts_dir
            .join(format!(".{}.tmp", Uuid::now_v7()));
        if let Err(err) = tokio::fs::write(&tmp_path, bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }
}

impl DraftStore for LocalDraftStore {
    async fn save_draft(
        &self,
        id: &DraftId,
        form_data: &FormData,
        wizard_state: &WizardState,
    ) -> Result<(), StorageError> {
        let path = self.draft_path(id);
        let now = Utc::now();

        // Keep the original creation time; a corrupt previous file is overwritten.
        let created_at = match self.read_envelope(&path).await {
            Ok(Some(existing)) => existing.created_at,
            Ok(None) => now,
            Err(err) => {
                tracing::warn!(draft_id = %id, error = %err, "replacing unreadable draft file");
                now
            }
        };

        let sealed = payload::seal(&self.cipher, form_data, wizard_state)?;
        let envelope = DraftEnvelope {
            version: ENVELOPE_VERSION,
            id: *id,
            current_step: wizard_state.current_step,
            field_count: form_data.field_count(),
            created_at,
            updated_at: now,
            payload: BASE64.encode(sealed),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        self.write_atomic(&path, &bytes).await?;

        tracing::debug!(draft_id = %id, path = %path.display(), "draft written");
        Ok(())
    }

    async fn load_draft(&self, id: &DraftId) -> Result<Option<Draft>, StorageError> {
        let Some(envelope) = self.read_envelope(&self.draft_path(id)).await? else {
            return Ok(None);
        };

        let sealed = BASE64
            .decode(envelope.payload.as_bytes())
            .map_err(|e| StorageError::Serialization(format!("invalid payload encoding: {e}")))?;
        let (form_data, wizard_state) = payload::open(&self.cipher, &sealed)?;

        Ok(Some(Draft {
            id: envelope.id,
            form_data,
            wizard_state,
            created_at: envelope.created_at,
            updated_at: envelope.updated_at,
        }))
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.drafts_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read_envelope(&path).await {
                Ok(Some(envelope)) => summaries.push(envelope.summary()),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable draft file");
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn delete_draft(&self, id: &DraftId) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.draft_path(id)).await {
            Ok(()) => {
                tracing::debug!(draft_id = %id, "draft file removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn test_store(dir: &Path) -> LocalDraftStore {
        LocalDraftStore::new(dir, DraftCipher::new(&[42u8; 32]))
    }

    fn sample_form() -> FormData {
        let mut form = FormData::empty();
        form.set("diagnose", json!("F32.1"));
        form.set("sitzungen", json!(24));
        form
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let id = DraftId::new();
        let mut wizard = WizardState::default();
        wizard.go_to(2);

        store.save_draft(&id, &sample_form(), &wizard).await.unwrap();
        let draft = store.load_draft(&id).await.unwrap().unwrap();

        assert_eq!(draft.id, id);
        assert_eq!(draft.form_data, sample_form());
        assert_eq!(draft.wizard_state, wizard);
    }

    #[tokio::test]
    async fn test_file_does_not_contain_plaintext_answers() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let id = DraftId::new();

        store
            .save_draft(&id, &sample_form(), &WizardState::default())
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(store.draft_path(&id)).await.unwrap();
        assert!(!raw.contains("F32.1"));
        assert!(raw.contains("\"field_count\": 2"));
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_at() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let id = DraftId::new();

        store
            .save_draft(&id, &FormData::empty(), &WizardState::default())
            .await
            .unwrap();
        let first = store.load_draft(&id).await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .save_draft(&id, &sample_form(), &WizardState::default())
            .await
            .unwrap();
        let second = store.load_draft(&id).await.unwrap().unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.form_data, sample_form());
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        assert!(store.load_draft(&DraftId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_with_wrong_key_fails() {
        let dir = tempdir().unwrap();
        let id = DraftId::new();
        test_store(dir.path())
            .save_draft(&id, &sample_form(), &WizardState::default())
            .await
            .unwrap();

        let other = LocalDraftStore::new(dir.path(), DraftCipher::new(&[7u8; 32]));
        let result = other.load_draft(&id).await;
        assert!(matches!(result, Err(StorageError::Encryption)));
    }

    #[tokio::test]
    async fn test_list_sorted_and_skips_garbage() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let older = DraftId::new();
        let newer = DraftId::new();

        assert!(store.list_drafts().await.unwrap().is_empty());

        store
            .save_draft(&older, &FormData::empty(), &WizardState::default())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .save_draft(&newer, &sample_form(), &WizardState::default())
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("drafts").join("broken.json"), "{")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("drafts").join("notes.txt"), "ignored")
            .await
            .unwrap();

        let summaries = store.list_drafts().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, newer);
        assert_eq!(summaries[0].field_count, 2);
        assert_eq!(summaries[1].id, older);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let id = DraftId::new();

        store
            .save_draft(&id, &sample_form(), &WizardState::default())
            .await
            .unwrap();
        store.delete_draft(&id).await.unwrap();
        store.delete_draft(&id).await.unwrap();

        assert!(store.load_draft(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let id = DraftId::new();
        for _ in 0..3 {
            store
                .save_draft(&id, &sample_form(), &WizardState::default())
                .await
                .unwrap();
        }

        let mut entries = tokio::fs::read_dir(dir.path().join("drafts")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec![format!("{id}.json")]);
    }
}
