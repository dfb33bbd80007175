//! Storage abstractions for Gutachtomat.
//!
//! Defines the draft persistence trait, its type-erased wrapper, and an
//! in-process implementation. Durable implementations live in
//! gutachtomat-infra.

pub mod box_store;
pub mod draft_store;
pub mod memory;

pub use box_store::BoxDraftStore;
pub use draft_store::DraftStore;
pub use memory::MemoryDraftStore;
