//! Type definitions for porter storage.

mod accounts;
mod ids;

// Re-export all types from submodules
pub use accounts::*;
pub use ids::*;
