//! Encrypted draft payloads.
//!
//! Both stores keep listing metadata in the clear and seal the form answers
//! and wizard state together as one JSON document.

use serde::{Deserialize, Serialize};

use gutachtomat_types::draft::{FormData, WizardState};
use gutachtomat_types::error::StorageError;

use super::cipher::DraftCipher;

#[derive(Serialize, Deserialize)]
struct DraftPayload {
    form_data: FormData,
    #[serde(default)]
    wizard_state: WizardState,
}

/// Serialize and encrypt draft content.
pub fn seal(
    cipher: &DraftCipher,
    form_data: &FormData,
    wizard_state: &WizardState,
) -> Result<Vec<u8>, StorageError> {
    let payload = DraftPayload {
        form_data: form_data.clone(),
        wizard_state: wizard_state.clone(),
    };
    let plaintext = serde_json::to_vec(&payload)?;
    Ok(cipher.encrypt(&plaintext)?)
}

/// Decrypt and deserialize content produced by [`seal`].
pub fn open(cipher: &DraftCipher, sealed: &[u8]) -> Result<(FormData, WizardState), StorageError> {
    let plaintext = cipher.decrypt(sealed)?;
    let payload: DraftPayload = serde_json::from_slice(&plaintext)?;
    Ok((payload.form_data, payload.wizard_state))
}
