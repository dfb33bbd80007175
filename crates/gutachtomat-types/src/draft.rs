//! Draft domain types.
//!
//! A draft is the persisted unit of work-in-progress: the clinical form
//! answers (`FormData`) plus the wizard navigation metadata (`WizardState`).
//! The form content is opaque to the persistence layer; only its serialized
//! shape matters for change detection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub Uuid);

impl DraftId {
    /// Create a new DraftId using UUID v7 (time-sortable).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a DraftId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DraftId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The answers entered into the report wizard.
///
/// Stored as a JSON object keyed by field name. The structure of the
/// individual answers belongs to the form layer and is not interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(pub serde_json::Value);

impl FormData {
    /// An empty form (`{}`).
    pub fn empty() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Look up a single field.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    /// Set a field, replacing any previous value.
    ///
    /// A non-object root is replaced by an object holding only this field.
    pub fn set(&mut self, field: impl Into<String>, value: serde_json::Value) {
        if !self.0.is_object() {
            self.0 = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.0.as_object_mut() {
            map.insert(field.into(), value);
        }
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<serde_json::Value> {
        self.0.as_object_mut().and_then(|map| map.remove(field))
    }

    /// Number of top-level fields that carry a value.
    pub fn field_count(&self) -> usize {
        match &self.0 {
            serde_json::Value::Object(map) => map.values().filter(|v| !v.is_null()).count(),
            serde_json::Value::Null => 0,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self::empty()
    }
}

/// Where the user currently is in the report wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    /// Zero-based index of the visible wizard step.
    pub current_step: u32,
    /// Steps the user has already left at least once, sorted and unique.
    #[serde(default)]
    pub completed_steps: Vec<u32>,
    /// When the user last navigated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WizardState {
    /// Navigate to `step`, marking the step being left as completed.
    pub fn go_to(&mut self, step: u32) {
        let left = self.current_step;
        if let Err(pos) = self.completed_steps.binary_search(&left) {
            self.completed_steps.insert(pos, left);
        }
        self.current_step = step;
        self.updated_at = Some(Utc::now());
    }
}

/// A persisted draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub form_data: FormData,
    pub wizard_state: WizardState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight listing entry for a draft.
///
/// Built from the metadata each backend keeps next to the encrypted payload,
/// so listing never needs the decryption key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub id: DraftId,
    pub current_step: u32,
    pub field_count: usize,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draft_id_display_and_parse() {
        let id = DraftId::new();
        let parsed: DraftId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_draft_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<DraftId>().is_err());
    }

    #[test]
    fn test_draft_id_serializes_as_plain_string() {
        let id = DraftId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_form_data_set_get_remove() {
        let mut form = FormData::empty();
        assert!(form.is_empty());

        form.set("diagnose", json!("F32.1"));
        assert_eq!(form.get("diagnose"), Some(&json!("F32.1")));
        assert_eq!(form.field_count(), 1);

        assert_eq!(form.remove("diagnose"), Some(json!("F32.1")));
        assert!(form.get("diagnose").is_none());
    }

    #[test]
    fn test_form_data_set_on_non_object_root() {
        let mut form = FormData(json!(null));
        form.set("anamnese", json!("..."));
        assert_eq!(form.field_count(), 1);
    }

    #[test]
    fn test_field_count_ignores_nulls() {
        let form = FormData(json!({"a": 1, "b": null, "c": "x"}));
        assert_eq!(form.field_count(), 2);
    }

    #[test]
    fn test_wizard_go_to_marks_left_step_completed() {
        let mut wizard = WizardState::default();
        wizard.go_to(2);
        wizard.go_to(1);
        wizard.go_to(3);
        assert_eq!(wizard.current_step, 3);
        assert_eq!(wizard.completed_steps, vec![0, 1, 2]);
        assert!(wizard.updated_at.is_some());
    }

    #[test]
    fn test_wizard_state_deserializes_with_missing_fields() {
        let wizard: WizardState = serde_json::from_str(r#"{"current_step": 4}"#).unwrap();
        assert_eq!(wizard.current_step, 4);
        assert!(wizard.completed_steps.is_empty());
        assert!(wizard.updated_at.is_none());
    }
}
