//! FactLog Core: error taxonomy, configuration, and the typed records shared
//! by every pipeline stage.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DataPaths, FactLogConfig};
pub use error::{Error, Result};
pub use types::{DateKey, FactEntry, FactsByDay};
