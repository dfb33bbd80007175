//! SQLite storage for Gutachtomat.
//!
//! Stands in for the hosted database in cloud storage mode.

pub mod draft;
pub mod pool;

pub use draft::DatabaseDraftStore;
pub use pool::DatabasePool;
