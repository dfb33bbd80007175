//! BoxDraftStore -- object-safe dynamic dispatch wrapper for DraftStore.
//!
//! 1. Define an object-safe `DraftStoreDyn` trait with boxed futures
//! 2. Blanket-impl `DraftStoreDyn` for all `T: DraftStore`
//! 3. `BoxDraftStore` wraps `Box<dyn DraftStoreDyn>` and delegates
//!
//! Lets the host pick the local or cloud backend at runtime while the
//! autosave coordinator stays generic over a single concrete store type.

use futures_util::future::BoxFuture;

use gutachtomat_types::draft::{Draft, DraftId, DraftSummary, FormData, WizardState};
use gutachtomat_types::error::StorageError;

use super::draft_store::DraftStore;

/// Object-safe version of [`DraftStore`] with boxed futures.
pub trait DraftStoreDyn: Send + Sync {
    fn save_draft_boxed<'a>(
        &'a self,
        id: &'a DraftId,
        form_data: &'a FormData,
        wizard_state: &'a WizardState,
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    fn load_draft_boxed<'a>(
        &'a self,
        id: &'a DraftId,
    ) -> BoxFuture<'a, Result<Option<Draft>, StorageError>>;

    fn list_drafts_boxed(&self) -> BoxFuture<'_, Result<Vec<DraftSummary>, StorageError>>;

    fn delete_draft_boxed<'a>(&'a self, id: &'a DraftId) -> BoxFuture<'a, Result<(), StorageError>>;
}

impl<T: DraftStore> DraftStoreDyn for T {
    fn save_draft_boxed<'a>(
        &'a self,
        id: &'a DraftId,
        form_data: &'a FormData,
        wizard_state: &'a WizardState,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(self.save_draft(id, form_data, wizard_state))
    }

    fn load_draft_boxed<'a>(
        &'a self,
        id: &'a DraftId,
    ) -> BoxFuture<'a, Result<Option<Draft>, StorageError>> {
        Box::pin(self.load_draft(id))
    }

    fn list_drafts_boxed(&self) -> BoxFuture<'_, Result<Vec<DraftSummary>, StorageError>> {
        Box::pin(self.list_drafts())
    }

    fn delete_draft_boxed<'a>(&'a self, id: &'a DraftId) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(self.delete_draft(id))
    }
}

/// Type-erased draft store.
pub struct BoxDraftStore {
    inner: Box<dyn DraftStoreDyn>,
    backend: &'static str,
}

impl BoxDraftStore {
    /// Wrap a concrete store. `backend` is a short label used in logs.
    pub fn new<T: DraftStore + 'static>(store: T, backend: &'static str) -> Self {
        Self {
            inner: Box::new(store),
            backend,
        }
    }

    /// Label of the wrapped backend.
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

impl DraftStore for BoxDraftStore {
    async fn save_draft(
        &self,
        id: &DraftId,
        form_data: &FormData,
        wizard_state: &WizardState,
    ) -> Result<(), StorageError> {
        self.inner.save_draft_boxed(id, form_data, wizard_state).await
    }

    async fn load_draft(&self, id: &DraftId) -> Result<Option<Draft>, StorageError> {
        self.inner.load_draft_boxed(id).await
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, StorageError> {
        self.inner.list_drafts_boxed().await
    }

    async fn delete_draft(&self, id: &DraftId) -> Result<(), StorageError> {
        self.inner.delete_draft_boxed(id).await
    }
}

impl std::fmt::Debug for BoxDraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxDraftStore")
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryDraftStore;

    #[tokio::test]
    async fn boxed_store_delegates_save_and_load() {
        let store = BoxDraftStore::new(MemoryDraftStore::new(), "memory");
        let id = DraftId::new();
        let mut form = FormData::empty();
        form.set("diagnose", serde_json::json!("F41.1"));

        store
            .save_draft(&id, &form, &WizardState::default())
            .await
            .unwrap();

        let loaded = store.load_draft(&id).await.unwrap().unwrap();
        assert_eq!(loaded.form_data, form);
        assert_eq!(store.list_drafts().await.unwrap().len(), 1);

        store.delete_draft(&id).await.unwrap();
        assert!(store.load_draft(&id).await.unwrap().is_none());
    }

    #[test]
    fn debug_shows_backend() {
        let store = BoxDraftStore::new(MemoryDraftStore::new(), "memory");
        let debug = format!("{store:?}");
        assert!(debug.contains("memory"));
        assert_eq!(store.backend(), "memory");
    }
}
