//! Store summary types.

use serde::Serialize;

use factlog_core::DateKey;

/// Bucket and entry counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub dates: usize,
    pub facts: usize,
    #[serde(rename = "firstDate")]
    pub first_date: Option<DateKey>,
    #[serde(rename = "lastDate")]
    pub last_date: Option<DateKey>,
}
