//! Cryptographic operations for Gutachtomat.
//!
//! - `cipher`: AES-256-GCM encryption of draft payloads at rest
//! - `payload`: sealing form data and wizard state into one encrypted blob

pub mod cipher;
pub mod payload;

pub use cipher::{CipherError, DraftCipher};
