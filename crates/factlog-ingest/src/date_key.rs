//! Date keys from document URLs.
//!
//! Call logs are named `<prefix>_<name>_<date>...`; the third
//! underscore-delimited segment of the URL path carries the call date in
//! whatever form the uploader used.

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use factlog_core::{DateKey, Error, Result};

/// Index of the date segment after splitting on `_`.
const DATE_SEGMENT: usize = 2;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+|\d+").unwrap());

/// `YYYY-MM-DD` followed by a time of day (`2024-01-15T10:30`, `2024-01-15 1030`).
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2})[Tt ]\d{1,2}:?\d{2}").unwrap());

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const ORDINAL_SUFFIXES: [&str; 4] = ["st", "nd", "rd", "th"];

/// Resolve the date key for a document URL using flexible date parsing.
///
/// Accepts absolute URLs (only the path is considered) and bare paths.
pub fn resolve(url: &str) -> Result<DateKey> {
    let path = url_path(url);
    let segment = path
        .split('_')
        .nth(DATE_SEGMENT)
        .ok_or_else(|| Error::InvalidUrlFormat(format!("{}: fewer than three '_' segments", url)))?;

    let candidate = strip_extension(segment.split('/').next().unwrap_or(segment));
    parse_flexible_date(candidate)
        .map(DateKey::from_date)
        .ok_or_else(|| Error::InvalidUrlFormat(format!("{}: '{}' is not a date", url, candidate)))
}

/// Resolve the date key from a compact `YYYYMMDD` slug.
///
/// Unlike [`resolve`], the whole string is split and the third segment must
/// be exactly eight digits naming a real date.
pub fn resolve_compact(url: &str) -> Result<DateKey> {
    let segment = url
        .split('_')
        .nth(DATE_SEGMENT)
        .ok_or_else(|| Error::InvalidUrlFormat(format!("{}: fewer than three '_' segments", url)))?;

    let candidate = strip_extension(segment);
    if candidate.len() != 8 || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidDateFormat(format!(
            "{}: expected YYYYMMDD, got '{}'",
            url, candidate
        )));
    }

    NaiveDate::parse_from_str(candidate, "%Y%m%d")
        .map(DateKey::from_date)
        .map_err(|_| Error::InvalidDateFormat(format!("{}: '{}' is not a date", url, candidate)))
}

/// Parse a human-written date.
///
/// Understands compact digits (`20240115`, `240115`), year-first numeric
/// forms (`2024-01-15`, `2024/1/15`), month-first numeric forms (`1/15/2024`,
/// day-first only when the first number cannot be a month), and month names
/// in any position (`Jan 15 2024`, `15th-January-2024`). A month name with a
/// day but no year (`Jan 15`) falls in the current local year. ISO timestamps
/// keep only their date part. Weekday names are ignored. Two-digit years
/// pivot at 69.
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    let text = match TIMESTAMP_RE.captures(text) {
        Some(caps) => caps.get(1).map_or(text, |m| m.as_str()),
        None => text,
    };

    let mut numbers: Vec<&str> = Vec::new();
    let mut month_name: Option<u32> = None;

    for token in TOKEN_RE.find_iter(text).map(|m| m.as_str()) {
        if token.as_bytes()[0].is_ascii_digit() {
            numbers.push(token);
            continue;
        }
        let lower = token.to_ascii_lowercase();
        if ORDINAL_SUFFIXES.contains(&lower.as_str()) || matches_name(&lower, &WEEKDAYS).is_some() {
            continue;
        }
        match matches_name(&lower, &MONTHS) {
            Some(m) if month_name.is_none() => month_name = Some(m as u32 + 1),
            _ => return None,
        }
    }

    match month_name {
        Some(month) => with_month_name(month, &numbers),
        None => numeric_only(&numbers),
    }
}

fn with_month_name(month: u32, numbers: &[&str]) -> Option<NaiveDate> {
    match numbers {
        [day] if day.len() <= 2 => {
            NaiveDate::from_ymd_opt(Local::now().year(), month, day.parse().ok()?)
        }
        [a, b] => {
            let (day, year) = if a.len() == 4 { (b, a) } else { (a, b) };
            NaiveDate::from_ymd_opt(parse_year(year)?, month, day.parse().ok()?)
        }
        _ => None,
    }
}

fn numeric_only(numbers: &[&str]) -> Option<NaiveDate> {
    match numbers {
        [compact] if compact.len() == 8 => NaiveDate::parse_from_str(compact, "%Y%m%d").ok(),
        [compact] if compact.len() == 6 => {
            let year = parse_year(&compact[..2])?;
            NaiveDate::from_ymd_opt(year, compact[2..4].parse().ok()?, compact[4..].parse().ok()?)
        }
        [y, m, d] if y.len() == 4 => {
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
        }
        [a, b, y] => {
            let first: u32 = a.parse().ok()?;
            let second: u32 = b.parse().ok()?;
            let (month, day) = if first > 12 && second <= 12 {
                (second, first)
            } else {
                (first, second)
            };
            NaiveDate::from_ymd_opt(parse_year(y)?, month, day)
        }
        _ => None,
    }
}

fn parse_year(token: &str) -> Option<i32> {
    let value: i32 = token.parse().ok()?;
    match token.len() {
        4 => Some(value),
        1 | 2 if value < 69 => Some(2000 + value),
        1 | 2 => Some(1900 + value),
        _ => None,
    }
}

/// Index of the name `token` spells out or abbreviates (three letters min).
fn matches_name(token: &str, names: &[&str]) -> Option<usize> {
    if token.len() < 3 {
        return None;
    }
    names.iter().position(|name| name.starts_with(token))
}

fn url_path(url: &str) -> &str {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => {
            // Slice the original string so the path keeps its spelling.
            let path = parsed.path();
            url.find(path).map(|i| &url[i..i + path.len()]).unwrap_or(url)
        }
        _ => url.split(['?', '#']).next().unwrap_or(url),
    }
}

/// Drop a trailing `.ext` when the extension is alphabetic (`.vtt`, `.txt`),
/// leaving dotted dates like `15.01.2024` intact.
fn strip_extension(segment: &str) -> &str {
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphabetic()) => {
            stem
        }
        _ => segment,
    }
}
