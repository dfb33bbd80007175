//! Draft persistence trait.
//!
//! Defines `DraftStore`, the storage capability the autosave coordinator
//! writes through. Implementations (encrypted local files, encrypted database
//! rows) live in gutachtomat-infra.

use std::future::Future;

use gutachtomat_types::draft::{Draft, DraftId, DraftSummary, FormData, WizardState};
use gutachtomat_types::error::StorageError;

/// Persistence interface for report drafts.
///
/// Uses RPITIT (return position `impl Trait` in traits) consistent with
/// all async traits in this project.
pub trait DraftStore: Send + Sync {
    /// Save or update a draft (upsert on id).
    ///
    /// An existing draft keeps its original `created_at`.
    fn save_draft(
        &self,
        id: &DraftId,
        form_data: &FormData,
        wizard_state: &WizardState,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Load a draft by id.
    ///
    /// Returns `None` if no draft exists for the given id.
    fn load_draft(
        &self,
        id: &DraftId,
    ) -> impl Future<Output = Result<Option<Draft>, StorageError>> + Send;

    /// List all saved drafts as lightweight summaries.
    ///
    /// Ordered by `updated_at` descending (most recently touched first).
    fn list_drafts(&self) -> impl Future<Output = Result<Vec<DraftSummary>, StorageError>> + Send;

    /// Delete a draft by id.
    ///
    /// No-op if the draft does not exist.
    fn delete_draft(&self, id: &DraftId) -> impl Future<Output = Result<(), StorageError>> + Send;
}
