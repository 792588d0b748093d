//! Fact and date-key records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canonical date format for bucket keys.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Store layout: date bucket → ordered facts.
pub type FactsByDay = BTreeMap<DateKey, Vec<FactEntry>>;

/// Canonical `YYYY-MM-DD` bucket key.
///
/// The canonical form sorts chronologically, so the derived `Ord` on the
/// inner string is the calendar order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

impl DateKey {
    /// Parse a key that is already in canonical form.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let date = NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT)
            .map_err(|_| Error::InvalidDateFormat(s.to_string()))?;
        let key = Self::from_date(date);
        // Reject non-padded forms like 2024-1-5, which chrono accepts.
        if key.0 != trimmed {
            return Err(Error::InvalidDateFormat(s.to_string()));
        }
        Ok(key)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(DATE_KEY_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_date(&self) -> NaiveDate {
        // Construction guarantees the canonical form.
        NaiveDate::parse_from_str(&self.0, DATE_KEY_FORMAT).unwrap_or_default()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DateKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

/// A single extracted fact, attributed to the question that produced it.
///
/// Identity for deduplication is the `(question, fact)` pair. Decoding
/// applies the same check as [`FactEntry::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFactEntry")]
pub struct FactEntry {
    pub question: String,
    pub fact: String,
}

#[derive(Deserialize)]
struct RawFactEntry {
    question: String,
    fact: String,
}

impl TryFrom<RawFactEntry> for FactEntry {
    type Error = Error;

    fn try_from(raw: RawFactEntry) -> Result<Self> {
        Self::new(raw.question, raw.fact)
    }
}

impl FactEntry {
    /// Build an entry. The fact must contain non-whitespace text.
    pub fn new(question: impl Into<String>, fact: impl Into<String>) -> Result<Self> {
        let fact = fact.into();
        if fact.trim().is_empty() {
            return Err(Error::InvalidFact("fact text is empty".into()));
        }
        Ok(Self {
            question: question.into(),
            fact,
        })
    }

    pub fn identity(&self) -> (&str, &str) {
        (&self.question, &self.fact)
    }
}
