//! Shared domain types for Gutachtomat.
//!
//! Drafts, wizard state, storage mode selection, configuration and the
//! storage error type used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, uuid, chrono,
//! thiserror.

pub mod config;
pub mod draft;
pub mod error;
pub mod storage;
