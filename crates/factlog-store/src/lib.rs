//! FactLog Store: date-keyed fact buckets persisted as one JSON document.

pub mod json;
pub mod types;

pub use json::{read_snapshot, FactStore};
pub use types::*;
