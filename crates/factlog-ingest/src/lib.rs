//! FactLog Ingest: document retrieval, call-log transcript parsing, and
//! date-key resolution from document URLs.

pub mod date_key;
pub mod fetch;
pub mod transcript;

pub use date_key::{parse_flexible_date, resolve, resolve_compact};
pub use fetch::{DocumentFetcher, HttpFetcher};
pub use transcript::{Transcript, TranscriptLine};
