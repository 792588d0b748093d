//! Error types for FactLog.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrlFormat(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Store decode error: {0}")]
    StoreDecode(String),

    #[error("Fact store is empty")]
    EmptyStore,

    #[error("Invalid fact: {0}")]
    InvalidFact(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is confined to a single document of a batch.
    pub fn is_document_local(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_)
                | Self::Generation(_)
                | Self::InvalidUrlFormat(_)
                | Self::InvalidDateFormat(_)
                | Self::InvalidFact(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
