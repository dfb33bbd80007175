//! Change fingerprints for draft content.
//!
//! A fingerprint is the SHA-256 digest of a draft's JSON serialization. Two
//! flavours exist: `combined` covers form data and wizard state and decides
//! whether a storage write is needed; `form_only` covers the answers alone
//! and drives the "unsaved changes" indicator.

use std::fmt;

use sha2::{Digest, Sha256};

use gutachtomat_types::draft::{FormData, WizardState};

const COMBINED_DOMAIN: &[u8] = b"gutachtomat/combined/v1\0";
const FORM_ONLY_DOMAIN: &[u8] = b"gutachtomat/form/v1\0";

/// Lowercase hex SHA-256 digest of serialized draft content.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of form data plus wizard state.
    pub fn combined(form_data: &FormData, wizard_state: &WizardState) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(COMBINED_DOMAIN);
        hasher.update(serialize(form_data));
        hasher.update(b"\0");
        hasher.update(serialize(wizard_state));
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint of form data alone.
    pub fn form_only(form_data: &FormData) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(FORM_ONLY_DOMAIN);
        hasher.update(serialize(form_data));
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to tell fingerprints apart in logs.
        write!(f, "Fingerprint({})", &self.0[..12])
    }
}

/// Both fingerprints as of the last successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub combined: Fingerprint,
    pub form_only: Fingerprint,
}

impl Baseline {
    pub fn capture(form_data: &FormData, wizard_state: &WizardState) -> Self {
        Self {
            combined: Fingerprint::combined(form_data, wizard_state),
            form_only: Fingerprint::form_only(form_data),
        }
    }
}

// Serializing a JSON value or the wizard state cannot fail.
fn serialize<T: serde::Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: serde_json::Value) -> FormData {
        FormData(value)
    }

    #[test]
    fn same_content_same_fingerprint() {
        let a = form(json!({"diagnose": "F32.1", "sitzungen": 24}));
        let b = form(json!({"diagnose": "F32.1", "sitzungen": 24}));
        assert_eq!(Fingerprint::form_only(&a), Fingerprint::form_only(&b));
    }

    #[test]
    fn different_content_different_fingerprint() {
        let a = form(json!({"diagnose": "F32.1"}));
        let b = form(json!({"diagnose": "F32.2"}));
        assert_ne!(Fingerprint::form_only(&a), Fingerprint::form_only(&b));
    }

    #[test]
    fn wizard_state_only_affects_combined() {
        let data = form(json!({"diagnose": "F32.1"}));
        let step0 = WizardState::default();
        let step3 = WizardState {
            current_step: 3,
            ..WizardState::default()
        };

        assert_ne!(
            Fingerprint::combined(&data, &step0),
            Fingerprint::combined(&data, &step3)
        );
        assert_eq!(Fingerprint::form_only(&data), Fingerprint::form_only(&data));
    }

    #[test]
    fn combined_and_form_only_never_collide() {
        let data = FormData::empty();
        let baseline = Baseline::capture(&data, &WizardState::default());
        assert_ne!(baseline.combined, baseline.form_only);
    }

    #[test]
    fn fingerprint_is_lowercase_hex() {
        let fp = Fingerprint::form_only(&FormData::empty());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn debug_is_truncated() {
        let fp = Fingerprint::form_only(&FormData::empty());
        let debug = format!("{fp:?}");
        assert!(debug.len() < 30);
    }
}
