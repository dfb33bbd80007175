//! In-process `DraftStore` backed by a concurrent map.
//!
//! Nothing survives the process. Used for tests and for hosts that only need
//! a scratch draft.

use chrono::Utc;
use dashmap::DashMap;

use gutachtomat_types::draft::{Draft, DraftId, DraftSummary, FormData, WizardState};
use gutachtomat_types::error::StorageError;

use super::draft_store::DraftStore;

#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: DashMap<DraftId, Draft>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

impl DraftStore for MemoryDraftStore {
    async fn save_draft(
        &self,
        id: &DraftId,
        form_data: &FormData,
        wizard_state: &WizardState,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        self.drafts
            .entry(*id)
            .and_modify(|draft| {
                draft.form_data = form_data.clone();
                draft.wizard_state = wizard_state.clone();
                draft.updated_at = now;
            })
            .or_insert_with(|| Draft {
                id: *id,
                form_data: form_data.clone(),
                wizard_state: wizard_state.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn load_draft(&self, id: &DraftId) -> Result<Option<Draft>, StorageError> {
        Ok(self.drafts.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, StorageError> {
        let mut summaries: Vec<DraftSummary> = self
            .drafts
            .iter()
            .map(|entry| {
                let draft = entry.value();
                DraftSummary {
                    id: draft.id,
                    current_step: draft.wizard_state.current_step,
                    field_count: draft.form_data.field_count(),
                    updated_at: draft.updated_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn delete_draft(&self, id: &DraftId) -> Result<(), StorageError> {
        self.drafts.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_upserts_and_keeps_created_at() {
        let store = MemoryDraftStore::new();
        let id = DraftId::new();

        store
            .save_draft(&id, &FormData::empty(), &WizardState::default())
            .await
            .unwrap();
        let first = store.load_draft(&id).await.unwrap().unwrap();

        let mut form = FormData::empty();
        form.set("symptomatik", json!("Schlafstoerungen"));
        store
            .save_draft(&id, &form, &WizardState::default())
            .await
            .unwrap();

        let second = store.load_draft(&id).await.unwrap().unwrap();
        assert_eq!(second.form_data, form);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_most_recent_first() {
        let store = MemoryDraftStore::new();
        let older = DraftId::new();
        let newer = DraftId::new();

        store
            .save_draft(&older, &FormData::empty(), &WizardState::default())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .save_draft(&newer, &FormData::empty(), &WizardState::default())
            .await
            .unwrap();

        let summaries = store.list_drafts().await.unwrap();
        assert_eq!(summaries[0].id, newer);
        assert_eq!(summaries[1].id, older);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_noop() {
        let store = MemoryDraftStore::new();
        store.delete_draft(&DraftId::new()).await.unwrap();
        assert!(store.is_empty());
    }
}
