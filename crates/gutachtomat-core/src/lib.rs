//! Gutachtomat core: storage ports and the draft autosave coordinator.
//!
//! This crate has no knowledge of concrete backends. File and database
//! stores live in gutachtomat-infra; hosts wire them in through
//! [`storage::DraftStore`] or the type-erased [`storage::BoxDraftStore`].

pub mod autosave;
pub mod storage;
