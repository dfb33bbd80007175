//! AES-256-GCM encryption for draft payloads at rest.
//!
//! Drafts contain clinical notes, so neither backend stores them in the
//! clear. The key can come from:
//! - A raw 32-byte key
//! - A passphrase (Argon2id key derivation)
//! - A key file in the data directory (auto-generated on first use)
//!
//! Encrypted format: `nonce (12 bytes) || ciphertext`
//!
//! SECURITY: Error types never contain plaintext or key material.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use thiserror::Error;

use gutachtomat_types::error::StorageError;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Argon2 salt for passphrase-derived keys.
const PASSPHRASE_SALT: &[u8] = b"gutachtomat-drafts-v1";

/// Errors from draft encryption.
///
/// Display output never includes plaintext, key material, or ciphertext.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("key file error: {0}")]
    KeyFile(String),

    #[error("key file is corrupted")]
    CorruptKeyFile,
}

impl From<CipherError> for StorageError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::KeyFile(msg) => StorageError::Io(msg),
            _ => StorageError::Encryption,
        }
    }
}

/// Symmetric cipher shared by the local and database draft stores.
///
/// Each call to `encrypt` uses a fresh random nonce, so the same draft
/// encrypts to different bytes every time.
#[derive(Clone)]
pub struct DraftCipher {
    cipher: Aes256Gcm,
}

impl DraftCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Derive the key from a passphrase using Argon2id.
    ///
    /// OWASP parameters: 19 MiB memory, 2 iterations, 1 lane. The salt is
    /// fixed, so the same passphrase always yields the same key.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CipherError> {
        use argon2::{Algorithm, Argon2, Params, Version};

        let params =
            Params::new(19456, 2, 1, Some(32)).map_err(|_| CipherError::KeyDerivationFailed)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(passphrase.as_bytes(), PASSPHRASE_SALT, &mut key)
            .map_err(|_| CipherError::KeyDerivationFailed)?;

        Ok(Self::new(&key))
    }

    /// Load the key from `path`, generating and writing a random one if the
    /// file does not exist yet.
    ///
    /// The key is stored as 64 hex characters. On unix the file is created
    /// with mode `0600`.
    pub async fn from_key_file(path: &Path) -> Result<Self, CipherError> {
        match tokio::fs::read_to_string(path).await {
            Ok(hex_key) => {
                let key_bytes =
                    hex_decode(hex_key.trim()).map_err(|_| CipherError::CorruptKeyFile)?;
                let key: [u8; 32] = key_bytes
                    .try_into()
                    .map_err(|_| CipherError::CorruptKeyFile)?;
                Ok(Self::new(&key))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let key = rand_bytes();
                write_key_file(path, &hex_encode(&key)).await?;
                tracing::info!(path = %path.display(), "generated new draft encryption key");
                Ok(Self::new(&key))
            }
            Err(err) => Err(CipherError::KeyFile(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    /// Encrypt plaintext. Returns `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by `encrypt()`.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if data.len() < NONCE_SIZE {
            return Err(CipherError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}

impl std::fmt::Debug for DraftCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DraftCipher(..)")
    }
}

async fn write_key_file(path: &Path, hex_key: &str) -> Result<(), CipherError> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CipherError::KeyFile(format!("failed to create {}: {e}", parent.display())))?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| CipherError::KeyFile(format!("failed to create {}: {e}", path.display())))?;
    file.write_all(hex_key.as_bytes())
        .await
        .map_err(|e| CipherError::KeyFile(format!("failed to write {}: {e}", path.display())))?;
    file.sync_all()
        .await
        .map_err(|e| CipherError::KeyFile(format!("failed to sync {}: {e}", path.display())))?;
    Ok(())
}

fn rand_bytes() -> [u8; 32] {
    use aes_gcm::aead::rand_core::RngCore;
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd length hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .ok_or_else(|| format!("non-ascii hex at position {i}"))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16)
                        .map_err(|e| format!("invalid hex at position {i}: {e}"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(7);
        }
        key
    }

    #[test]
    fn test_decrypt_recovers_plaintext() {
        let cipher = DraftCipher::new(&test_key());
        let plaintext = br#"{"diagnose":"F32.1","anamnese":"seit 2019"}"#;

        let encrypted = cipher.encrypt(plaintext).unwrap();
        assert_ne!(&encrypted[NONCE_SIZE..], plaintext.as_slice());
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = DraftCipher::new(&test_key());
        let mut other = test_key();
        other[0] ^= 0xFF;

        let encrypted = cipher.encrypt(b"befund").unwrap();
        let result = DraftCipher::new(&other).decrypt(&encrypted);
        assert!(matches!(result, Err(CipherError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = DraftCipher::new(&test_key());
        let mut encrypted = cipher.encrypt(b"befund").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;

        assert!(matches!(
            cipher.decrypt(&encrypted),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_nonces_differ() {
        let cipher = DraftCipher::new(&test_key());
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ciphertext_too_short() {
        let cipher = DraftCipher::new(&test_key());
        assert!(matches!(
            cipher.decrypt(&[0u8; 5]),
            Err(CipherError::CiphertextTooShort)
        ));
    }

    #[test]
    fn test_from_passphrase_is_deterministic() {
        let a = DraftCipher::from_passphrase("praxis-passwort").unwrap();
        let b = DraftCipher::from_passphrase("praxis-passwort").unwrap();
        let c = DraftCipher::from_passphrase("anderes-passwort").unwrap();

        let encrypted = a.encrypt(b"test").unwrap();
        assert_eq!(b.decrypt(&encrypted).unwrap(), b"test");
        assert!(c.decrypt(&encrypted).is_err());
    }

    #[tokio::test]
    async fn test_key_file_generated_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("draft.key");

        let first = DraftCipher::from_key_file(&path).await.unwrap();
        let stored = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(stored.len(), 64);

        let second = DraftCipher::from_key_file(&path).await.unwrap();
        let encrypted = first.encrypt(b"persisted").unwrap();
        assert_eq!(second.decrypt(&encrypted).unwrap(), b"persisted");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.key");
        DraftCipher::from_key_file(&path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_corrupt_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.key");
        tokio::fs::write(&path, "not-hex").await.unwrap();

        let result = DraftCipher::from_key_file(&path).await;
        assert!(matches!(result, Err(CipherError::CorruptKeyFile)));
    }

    #[test]
    fn test_hex_helpers() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0xFF];
        assert_eq!(hex_encode(&bytes), "deadbeef00ff");
        assert_eq!(hex_decode("deadbeef00ff").unwrap(), bytes);
        assert!(hex_decode("abc").is_err());
    }

    #[test]
    fn test_errors_map_to_storage_error() {
        assert!(matches!(
            StorageError::from(CipherError::DecryptionFailed),
            StorageError::Encryption
        ));
        assert!(matches!(
            StorageError::from(CipherError::KeyFile("denied".into())),
            StorageError::Io(_)
        ));
    }
}
