//! Runtime coordinator: drives fetch → parse → extract → store for batches
//! of documents and exposes the current job for polling.
//!
//! The same batch loop serves both the blocking shape (`process`) and the
//! background shape (`submit` + `status`).

pub mod coordinator;
pub mod types;

pub use coordinator::{BatchHandle, Coordinator, PipelineSettings};
pub use types::*;
