//! Storage abstraction for porter.
//!
//! Backend crates (e.g., porter-store-sqlite) implement [`AccountStore`] so the attribution
//! engine and the onboarding flow don't depend on any specific database engine or schema.

mod store;
mod types;

pub use store::*;
pub use types::*;

use thiserror::Error;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
