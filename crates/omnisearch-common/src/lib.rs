//! omnisearch-common — Shared types, errors, and traits used across all omnisearch crates.

pub mod error;
pub mod table;
pub mod database;

// Re-export commonly used types
pub use database::LiteratureDatabase;
pub use error::{OmnisearchError, Result};
pub use table::Table;
