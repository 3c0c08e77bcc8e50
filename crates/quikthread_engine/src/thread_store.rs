use std::sync::{Arc, Mutex, PoisonError};

use quikthread_core::{self as model, ThreadPatch, ThreadRecord};
use quikthread_logging::{qt_debug, qt_info, qt_warn};
use serde::Deserialize;
use serde_json::Value;

use crate::{KeyValueStorage, StorageError};

pub const THREADS_KEY: &str = "threads";

/// Thread records persisted as one JSON list under `THREADS_KEY`.
///
/// Every operation is a synchronous load, mutate, save under one lock, so
/// concurrent callers (the poller and any list view) never interleave
/// between a read and its write. Unparseable stored data reads as an empty
/// list; single entries that do not decode are kept verbatim.
pub struct ThreadStore {
    storage: Arc<dyn KeyValueStorage>,
    lock: Mutex<()>,
}

impl ThreadStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Prepends `record` unless its id is already stored.
    pub fn insert_if_absent(&self, record: ThreadRecord) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stored = self.load()?;
        let id = record.id.clone();
        if stored.holds_unreadable(&id) || !model::insert_if_absent(&mut stored.threads, record) {
            qt_debug!(job = id; "thread already stored, insert skipped");
            return Ok(false);
        }
        self.save(&stored)?;
        Ok(true)
    }

    /// Shallow-merges `patch` into the record with `id`.
    /// Returns false and writes nothing when no such record exists.
    pub fn update_by_id(&self, id: &str, patch: &ThreadPatch) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stored = self.load()?;
        if !model::update_by_id(&mut stored.threads, id, patch) {
            return Ok(false);
        }
        self.save(&stored)?;
        Ok(true)
    }

    /// Removes every record with `id`. Always writes, even when nothing matched.
    pub fn remove_by_id(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stored = self.load()?;
        let unreadable = stored.unreadable.len();
        stored.unreadable.retain(|raw| raw_id(raw) != Some(id));
        let removed =
            model::remove_by_id(&mut stored.threads, id) + unreadable - stored.unreadable.len();
        qt_info!(job = id; "removed {} thread record(s)", removed);
        self.save(&stored)
    }

    pub fn find_by_id(&self, id: &str) -> Option<ThreadRecord> {
        self.list().into_iter().find(|t| t.id == id)
    }

    /// Current list in storage order. Read failures are logged and read as empty.
    pub fn list(&self) -> Vec<ThreadRecord> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.load() {
            Ok(stored) => stored.threads,
            Err(err) => {
                qt_warn!("Failed to read thread list: {}", err);
                Vec::new()
            }
        }
    }

    /// Drops later duplicates of each id and returns the canonical list.
    /// Writes only when something was dropped.
    pub fn deduplicate(&self) -> Result<Vec<ThreadRecord>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = self.load()?;
        let (unique, dropped) = model::dedupe_by_id(stored.threads);
        let stored = Stored {
            threads: unique,
            unreadable: stored.unreadable,
        };
        if !dropped.is_empty() {
            for id in &dropped {
                qt_warn!(job = id; "Removing duplicate thread");
            }
            qt_info!("Removed {} duplicate threads", dropped.len());
            self.save(&stored)?;
        }
        Ok(stored.threads)
    }

    fn load(&self) -> Result<Stored, StorageError> {
        let Some(raw) = self.storage.get(THREADS_KEY)? else {
            return Ok(Stored::default());
        };
        let entries: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                qt_warn!("Stored thread list is unreadable, treating as empty: {}", err);
                return Ok(Stored::default());
            }
        };
        let mut stored = Stored::default();
        for entry in entries {
            match ThreadRecord::deserialize(&entry) {
                Ok(record) => stored.threads.push(record),
                Err(err) => {
                    let id = raw_id(&entry).unwrap_or("?");
                    qt_warn!(job = id; "Keeping unreadable thread record as is: {}", err);
                    stored.unreadable.push(entry);
                }
            }
        }
        Ok(stored)
    }

    fn save(&self, stored: &Stored) -> Result<(), StorageError> {
        let mut entries = Vec::with_capacity(stored.threads.len() + stored.unreadable.len());
        for record in &stored.threads {
            entries.push(serde_json::to_value(record)?);
        }
        entries.extend(stored.unreadable.iter().cloned());
        let json = serde_json::to_string(&entries)?;
        self.storage.set(THREADS_KEY, &json)
    }
}

/// The stored list split into records this client understands and entries it
/// does not. The latter are written back after the readable ones.
#[derive(Default)]
struct Stored {
    threads: Vec<ThreadRecord>,
    unreadable: Vec<Value>,
}

impl Stored {
    fn holds_unreadable(&self, id: &str) -> bool {
        self.unreadable.iter().any(|raw| raw_id(raw) == Some(id))
    }
}

fn raw_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use chrono::{TimeZone, Utc};
    use quikthread_core::ThreadStatus;

    fn record(id: &str, title: &str) -> ThreadRecord {
        ThreadRecord::processing(id, title, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
    }

    fn store() -> (Arc<MemoryStorage>, ThreadStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), ThreadStore::new(storage))
    }

    #[test]
    fn duplicate_insert_is_reported_and_not_written() {
        let (storage, store) = store();
        assert!(store.insert_if_absent(record("a", "First")).unwrap());
        let snapshot = storage.get(THREADS_KEY).unwrap();
        let writes = storage.writes();

        assert!(!store.insert_if_absent(record("a", "Changed")).unwrap());
        assert_eq!(storage.get(THREADS_KEY).unwrap(), snapshot);
        assert_eq!(storage.writes(), writes);
    }

    #[test]
    fn update_miss_leaves_bytes_untouched() {
        let (storage, store) = store();
        store.insert_if_absent(record("a", "First")).unwrap();
        let snapshot = storage.get(THREADS_KEY).unwrap();
        let writes = storage.writes();

        let patch = ThreadPatch::progress(ThreadStatus::Processing, 50);
        assert!(!store.update_by_id("missing", &patch).unwrap());
        assert_eq!(storage.get(THREADS_KEY).unwrap(), snapshot);
        assert_eq!(storage.writes(), writes);
    }

    #[test]
    fn corrupt_storage_reads_as_empty() {
        let (storage, store) = store();
        storage.set(THREADS_KEY, "{not json").unwrap();

        assert!(store.list().is_empty());
        assert!(store.find_by_id("a").is_none());
        assert!(store.deduplicate().unwrap().is_empty());
        assert!(store.insert_if_absent(record("a", "First")).unwrap());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn remove_writes_even_when_absent() {
        let (storage, store) = store();
        store.remove_by_id("ghost").unwrap();
        assert_eq!(storage.writes(), 1);
        assert_eq!(storage.get(THREADS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn dedupe_without_stored_list_does_not_write() {
        let (storage, store) = store();
        assert!(store.deduplicate().unwrap().is_empty());
        assert_eq!(storage.writes(), 0);
    }

    fn stored_json(storage: &MemoryStorage) -> Vec<serde_json::Value> {
        let raw = storage.get(THREADS_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn one_odd_record_does_not_cost_the_others() {
        let (storage, store) = store();
        let seeded = serde_json::json!([
            {"id": "keep-me", "title": "Kept", "status": "complete", "createdAt": "2024-05-01T09:00:00Z", "progress": 100, "tweets": 7},
            {"id": "fraction", "title": "Half", "status": "processing", "createdAt": "2024-05-01T09:00:00Z", "progress": 42.5},
            {"id": "legacy", "title": "Old words", "status": "completed", "createdAt": "2024-05-01T09:00:00Z", "progress": 100},
            {"id": "undated", "title": "No date", "status": "processing", "progress": 10}
        ]);
        storage.set(THREADS_KEY, &seeded.to_string()).unwrap();

        let ids: Vec<_> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["keep-me", "fraction", "legacy"]);
        assert_eq!(store.find_by_id("fraction").unwrap().progress, 43);
        assert_eq!(store.find_by_id("legacy").unwrap().status, ThreadStatus::Complete);

        assert!(store.insert_if_absent(record("new", "Fresh")).unwrap());
        assert!(!store.insert_if_absent(record("undated", "Clash")).unwrap());

        let after = stored_json(&storage);
        let ids: Vec<_> = after.iter().map(|t| t["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["new", "keep-me", "fraction", "legacy", "undated"]);
        assert_eq!(after[1]["tweets"], 7);
        assert_eq!(after[4], seeded[3]);

        store.remove_by_id("undated").unwrap();
        assert_eq!(stored_json(&storage).len(), 4);
    }

    #[test]
    fn dedupe_keeps_first_occurrences_and_settles_after_one_write() {
        let (storage, store) = store();
        let mut threads = vec![
            record("A", "A first"),
            record("B", "B first"),
            record("A", "A second"),
            record("C", "C only"),
            record("B", "B second"),
        ];
        threads[2].progress = 90;
        threads[4].progress = 60;
        storage
            .set(THREADS_KEY, &serde_json::to_string(&threads).unwrap())
            .unwrap();
        let seeded_writes = storage.writes();

        let first = store.deduplicate().unwrap();
        let summary: Vec<_> = first.iter().map(|t| (t.id.as_str(), t.title.as_str(), t.progress)).collect();
        assert_eq!(summary, [("A", "A first", 0), ("B", "B first", 0), ("C", "C only", 0)]);
        assert_eq!(storage.writes(), seeded_writes + 1);
        let settled = storage.get(THREADS_KEY).unwrap();

        let second = store.deduplicate().unwrap();
        assert_eq!(second, first);
        assert_eq!(storage.writes(), seeded_writes + 1);
        assert_eq!(storage.get(THREADS_KEY).unwrap(), settled);
        assert_eq!(store.list(), first);
    }
}
