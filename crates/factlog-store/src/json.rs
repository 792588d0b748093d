//! JSON-file fact store.
//!
//! The whole store lives in memory behind a read-write lock and is rewritten
//! in full on every mutation. Writers are serialized through a separate mutex
//! so that each append is one read-modify-write of the complete document;
//! readers never block on disk I/O.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::types::StoreStats;
use factlog_core::{DateKey, Error, FactEntry, FactsByDay, Result};

/// Date-indexed, deduplicated collection of `(question, fact)` entries.
pub struct FactStore {
    path: PathBuf,
    facts: RwLock<FactsByDay>,
    writer: Mutex<()>,
}

impl FactStore {
    /// Load the store at `path`.
    ///
    /// A missing file starts an empty store. Buckets with a non-canonical
    /// key and entries that fail validation are skipped with a warning. A
    /// file that cannot be decoded at all is renamed to `<file>.bad` so the
    /// next append cannot overwrite it, and the store starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let facts = match read_snapshot(&path) {
            Ok(facts) => facts,
            Err(e) => {
                warn!("Starting with an empty fact store ({}): {}", path.display(), e);
                quarantine(&path);
                FactsByDay::new()
            }
        };

        let total: usize = facts.values().map(Vec::len).sum();
        info!(
            "FactStore loaded: {} dates, {} facts, path={}",
            facts.len(),
            total,
            path.display()
        );

        Self {
            path,
            facts: RwLock::new(facts),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Merge `entries` into the bucket for `date`, skipping any whose
    /// `(question, fact)` identity is already present, either in the stored
    /// bucket or earlier in `entries`.
    ///
    /// Returns the number of entries added. When at least one entry is added
    /// the full store is persisted before the in-memory view changes; if that
    /// write fails the store is left untouched.
    pub fn append<I>(&self, date: &DateKey, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = FactEntry>,
    {
        let _writer = self.writer.lock();

        let mut next = self.facts.read().clone();
        let bucket = next.entry(date.clone()).or_default();

        let mut seen: HashSet<(String, String)> = bucket
            .iter()
            .map(|e| (e.question.clone(), e.fact.clone()))
            .collect();

        let mut added = 0;
        for entry in entries {
            if seen.insert((entry.question.clone(), entry.fact.clone())) {
                bucket.push(entry);
                added += 1;
            }
        }

        if added == 0 {
            debug!("No new facts for {}", date);
            return Ok(0);
        }

        write_snapshot(&self.path, &next)?;
        *self.facts.write() = next;

        debug!("Appended {} facts to {}", added, date);
        Ok(added)
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Entries for `date` in stored order; empty when the date is unknown.
    pub fn query_by_date(&self, date: &DateKey) -> Vec<FactEntry> {
        self.facts.read().get(date).cloned().unwrap_or_default()
    }

    /// Earliest and latest bucket keys.
    pub fn date_range(&self) -> Result<(DateKey, DateKey)> {
        let facts = self.facts.read();
        match (facts.keys().next(), facts.keys().next_back()) {
            (Some(min), Some(max)) => Ok((min.clone(), max.clone())),
            _ => Err(Error::EmptyStore),
        }
    }

    /// All bucket keys, ascending.
    pub fn dates(&self) -> Vec<DateKey> {
        self.facts.read().keys().cloned().collect()
    }

    /// Full copy of the store.
    pub fn snapshot(&self) -> FactsByDay {
        self.facts.read().clone()
    }

    pub fn stats(&self) -> StoreStats {
        let facts = self.facts.read();
        StoreStats {
            dates: facts.len(),
            facts: facts.values().map(Vec::len).sum(),
            first_date: facts.keys().next().cloned(),
            last_date: facts.keys().next_back().cloned(),
        }
    }
}

/// Decode the persisted store, deduplicating each bucket (first seen wins).
///
/// A missing file decodes as an empty store. Content that is not a JSON
/// object is a [`Error::StoreDecode`]. Inside the object, each bucket is
/// decoded on its own: a bad key or a non-array bucket drops that bucket,
/// an invalid entry drops that entry, and buckets left empty are omitted.
pub fn read_snapshot(path: &Path) -> Result<FactsByDay> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FactsByDay::new()),
        Err(e) => return Err(Error::StoreDecode(format!("{}: {}", path.display(), e))),
    };

    let raw: BTreeMap<String, Value> = serde_json::from_str(&data)
        .map_err(|e| Error::StoreDecode(format!("{}: {}", path.display(), e)))?;

    let mut facts = FactsByDay::new();
    let mut invalid = 0;
    let mut removed = 0;
    for (key, bucket) in raw {
        let date = match DateKey::parse(&key) {
            Ok(date) => date,
            Err(e) => {
                warn!("Skipping bucket in {}: {}", path.display(), e);
                continue;
            }
        };
        let Value::Array(items) = bucket else {
            warn!("Skipping bucket {} in {}: not an array", date, path.display());
            continue;
        };

        let before = items.len();
        let entries: Vec<FactEntry> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        invalid += before - entries.len();

        let decoded = entries.len();
        let unique = dedup_bucket(entries);
        removed += decoded - unique.len();
        if !unique.is_empty() {
            facts.insert(date, unique);
        }
    }

    if invalid > 0 {
        warn!("Skipped {} invalid facts while loading {}", invalid, path.display());
    }
    if removed > 0 {
        info!("Dropped {} duplicate facts while loading {}", removed, path.display());
    }

    Ok(facts)
}

/// Move an undecodable store file to `<file>.bad`, replacing any earlier one.
fn quarantine(path: &Path) {
    if !path.exists() {
        return;
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".bad");
    let target = PathBuf::from(name);
    match std::fs::rename(path, &target) {
        Ok(()) => warn!("Moved unreadable fact store to {}", target.display()),
        Err(e) => warn!("Could not move {} aside: {}", path.display(), e),
    }
}

fn dedup_bucket(bucket: Vec<FactEntry>) -> Vec<FactEntry> {
    let mut seen = HashSet::new();
    bucket
        .into_iter()
        .filter(|e| seen.insert((e.question.clone(), e.fact.clone())))
        .collect()
}

/// Rewrite the whole store: temp file in the target directory, then rename.
fn write_snapshot(path: &Path, facts: &FactsByDay) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::Storage(e.to_string()))?;

    let json = serde_json::to_vec_pretty(facts)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::Storage(e.to_string()))?;
    tmp.write_all(&json)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::Storage(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn fact(q: &str, f: &str) -> FactEntry {
        FactEntry::new(q, f).unwrap()
    }

    fn test_store() -> (FactStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::open(dir.path().join("facts.json"));
        (store, dir)
    }

    #[test]
    fn test_open_missing_file() {
        let (store, _dir) = test_store();
        assert!(store.snapshot().is_empty());
        assert!(matches!(store.date_range(), Err(Error::EmptyStore)));
    }

    #[test]
    fn test_open_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        let moved = dir.path().join("facts.json.bad");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read_snapshot(&path), Err(Error::StoreDecode(_))));
        let store = FactStore::open(&path);
        assert!(store.snapshot().is_empty());
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&moved).unwrap(), "{ not json");

        // Later appends write a fresh file and leave the moved copy alone.
        store.append(&key("2024-01-15"), vec![fact("Q", "Blue")]).unwrap();
        assert_eq!(FactStore::open(&path).stats().facts, 1);
        assert_eq!(std::fs::read_to_string(&moved).unwrap(), "{ not json");

        std::fs::write(&path, "").unwrap();
        assert!(FactStore::open(&path).snapshot().is_empty());
        assert_eq!(std::fs::read_to_string(&moved).unwrap(), "");
    }

    #[test]
    fn test_load_skips_bad_buckets_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        std::fs::write(
            &path,
            r#"{
                "2024-01-15": [{"question": "Q", "fact": "Blue"}],
                "yesterday": [{"question": "Q", "fact": "Lost"}],
                "2024-1-5": [{"question": "Q", "fact": "Lost"}],
                "2024-01-16": [
                    {"question": "Q", "fact": "   "},
                    {"fact": "No question"},
                    {"question": "Q", "fact": "Ship Friday"}
                ],
                "2024-01-17": "not a bucket",
                "2024-01-18": [{"question": "Q", "fact": ""}]
            }"#,
        )
        .unwrap();

        let store = FactStore::open(&path);
        assert!(path.exists());
        assert_eq!(store.dates(), vec![key("2024-01-15"), key("2024-01-16")]);
        assert_eq!(store.query_by_date(&key("2024-01-15")), vec![fact("Q", "Blue")]);
        assert_eq!(store.query_by_date(&key("2024-01-16")), vec![fact("Q", "Ship Friday")]);

        // The next write keeps every valid bucket.
        store.append(&key("2024-01-20"), vec![fact("Q", "Hire")]).unwrap();
        assert_eq!(FactStore::open(&path).stats().facts, 3);
    }

    #[test]
    fn test_load_deduplicates_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        std::fs::write(
            &path,
            r#"{"2024-01-15": [
                {"question": "Q", "fact": "Blue"},
                {"question": "Q", "fact": "Accessible"},
                {"question": "Q", "fact": "Blue"},
                {"question": "Other", "fact": "Blue"}
            ]}"#,
        )
        .unwrap();

        let store = FactStore::open(&path);
        let facts = store.query_by_date(&key("2024-01-15"));
        assert_eq!(
            facts,
            vec![fact("Q", "Blue"), fact("Q", "Accessible"), fact("Other", "Blue")]
        );
    }

    #[test]
    fn test_append_skips_existing_and_repeated() {
        let (store, _dir) = test_store();
        let day = key("2024-01-15");

        let added = store
            .append(&day, vec![fact("Q", "Blue"), fact("Q", "Blue"), fact("Q", "Accessible")])
            .unwrap();
        assert_eq!(added, 2);

        let added = store
            .append(&day, vec![fact("Q", "Accessible"), fact("Q2", "Accessible")])
            .unwrap();
        assert_eq!(added, 1);

        assert_eq!(
            store.query_by_date(&day),
            vec![fact("Q", "Blue"), fact("Q", "Accessible"), fact("Q2", "Accessible")]
        );
    }

    #[test]
    fn test_append_nothing_new_leaves_file_alone() {
        let (store, _dir) = test_store();
        let day = key("2024-01-15");

        assert_eq!(store.append(&day, Vec::new()).unwrap(), 0);
        assert!(!store.path().exists());
        assert!(store.dates().is_empty());

        store.append(&day, vec![fact("Q", "Blue")]).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(store.append(&day, vec![fact("Q", "Blue")]).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_query_unknown_date_is_empty() {
        let (store, _dir) = test_store();
        store.append(&key("2024-01-15"), vec![fact("Q", "Blue")]).unwrap();
        assert!(store.query_by_date(&key("1999-12-31")).is_empty());
    }

    #[test]
    fn test_date_range() {
        let (store, _dir) = test_store();
        store.append(&key("2024-03-02"), vec![fact("Q", "a")]).unwrap();
        store.append(&key("2023-11-20"), vec![fact("Q", "b")]).unwrap();
        store.append(&key("2024-01-15"), vec![fact("Q", "c")]).unwrap();

        let (min, max) = store.date_range().unwrap();
        assert_eq!(min.as_str(), "2023-11-20");
        assert_eq!(max.as_str(), "2024-03-02");
        assert_eq!(store.dates().len(), 3);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");

        let saved = {
            let store = FactStore::open(&path);
            store
                .append(&key("2024-01-15"), vec![fact("Q", "Blue"), fact("Q", "Accessible")])
                .unwrap();
            store.append(&key("2024-01-16"), vec![fact("Q", "Ship it")]).unwrap();
            store.snapshot()
        };

        let reopened = FactStore::open(&path);
        assert_eq!(reopened.snapshot(), saved);
        assert_eq!(reopened.stats().facts, 3);
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = test_store();
        assert_eq!(store.stats(), StoreStats::default());

        store.append(&key("2024-01-15"), vec![fact("Q", "a"), fact("Q", "b")]).unwrap();
        let stats = store.stats();
        assert_eq!(stats.dates, 1);
        assert_eq!(stats.facts, 2);
        assert_eq!(stats.first_date, Some(key("2024-01-15")));
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        let store = Arc::new(FactStore::open(&path));
        let day = key("2024-01-15");
        let n = 32;

        std::thread::scope(|s| {
            for i in 0..n {
                let store = store.clone();
                let day = day.clone();
                s.spawn(move || {
                    store
                        .append(&day, vec![fact("Q", &format!("Fact number {}", i))])
                        .unwrap();
                });
            }
        });

        assert_eq!(store.query_by_date(&day).len(), n);
        assert_eq!(FactStore::open(&path).query_by_date(&day).len(), n);
    }
}
