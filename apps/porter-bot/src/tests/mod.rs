//! Bot tests driven through the dispatcher.
//!
//! - `common` - Shared harness: in-memory SQLite, a fake community platform and a manual clock
//! - `join_flow` - Join, leave and onboarding flows end to end

pub mod common;
