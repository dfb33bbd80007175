//! Infrastructure layer for Gutachtomat.
//!
//! Contains the durable implementations of the `DraftStore` port defined in
//! `gutachtomat-core`: an encrypted per-file local store and an encrypted
//! SQLite store, plus data directory resolution and `config.toml` loading.

pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod local;
pub mod sqlite;
