//! SQLite implementation of `DraftStore`.
//!
//! Persists drafts in the `drafts` table. The form answers and wizard state
//! are stored as one encrypted blob; `current_step` and `field_count` are
//! kept in plain columns so listing never decrypts.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use gutachtomat_core::storage::DraftStore;
use gutachtomat_types::draft::{Draft, DraftId, DraftSummary, FormData, WizardState};
use gutachtomat_types::error::StorageError;

use super::pool::DatabasePool;
use crate::crypto::{DraftCipher, payload};

/// SQLite-backed, encrypted draft persistence.
#[derive(Debug)]
pub struct DatabaseDraftStore {
    pool: DatabasePool,
    cipher: DraftCipher,
}

impl DatabaseDraftStore {
    pub fn new(pool: DatabasePool, cipher: DraftCipher) -> Self {
        Self { pool, cipher }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Database(format!("invalid datetime: {e}")))
}

fn parse_id(s: &str) -> Result<DraftId, StorageError> {
    s.parse()
        .map_err(|e| StorageError::Database(format!("invalid draft id: {e}")))
}

fn row_summary(row: &SqliteRow) -> Result<DraftSummary, StorageError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let current_step: i64 = row.try_get("current_step").map_err(db_err)?;
    let field_count: i64 = row.try_get("field_count").map_err(db_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(db_err)?;

    Ok(DraftSummary {
        id: parse_id(&id)?,
        current_step: u32::try_from(current_step).unwrap_or_default(),
        field_count: usize::try_from(field_count).unwrap_or_default(),
        updated_at: parse_datetime(&updated_at)?,
    })
}

// ---------------------------------------------------------------------------
// DraftStore implementation
// ---------------------------------------------------------------------------

impl DraftStore for DatabaseDraftStore {
    async fn save_draft(
        &self,
        id: &DraftId,
        form_data: &FormData,
        wizard_state: &WizardState,
    ) -> Result<(), StorageError> {
        let sealed = payload::seal(&self.cipher, form_data, wizard_state)?;
        // Fixed precision keeps the text column sortable.
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"INSERT INTO drafts (id, payload, current_step, field_count, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   payload = excluded.payload,
                   current_step = excluded.current_step,
                   field_count = excluded.field_count,
                   updated_at = excluded.updated_at"#,
        )
        .bind(id.to_string())
        .bind(sealed)
        .bind(i64::from(wizard_state.current_step))
        .bind(form_data.field_count() as i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(db_err)?;

        tracing::debug!(draft_id = %id, "draft row upserted");
        Ok(())
    }

    async fn load_draft(&self, id: &DraftId) -> Result<Option<Draft>, StorageError> {
        let row = sqlx::query(
            "SELECT id, payload, created_at, updated_at FROM drafts WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sealed: Vec<u8> = row.try_get("payload").map_err(db_err)?;
        let created_at: String = row.try_get("created_at").map_err(db_err)?;
        let updated_at: String = row.try_get("updated_at").map_err(db_err)?;
        let (form_data, wizard_state) = payload::open(&self.cipher, &sealed)?;

        Ok(Some(Draft {
            id: *id,
            form_data,
            wizard_state,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
        }))
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, current_step, field_count, updated_at FROM drafts ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_summary).collect()
    }

    async fn delete_draft(&self, id: &DraftId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(db_err)?;

        tracing::debug!(draft_id = %id, rows = result.rows_affected(), "draft row deleted");
        Ok(())
    }
}
