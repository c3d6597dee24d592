//! Shared data model for pagecond content.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_map};
