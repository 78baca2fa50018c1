//! Health record storage: redb on disk, a map in memory

use super::HealthStore;
use crate::error::{Error, Result};
use crate::models::HealthRecord;
use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

// (repo_id, timestamp millis) -> JSON-encoded HealthRecord
const RECORDS_TABLE: TableDefinition<(&str, i64), &[u8]> = TableDefinition::new("health_records");

fn check_order(repo_id: &str, last: Option<i64>, next: i64) -> Result<()> {
    match last {
        Some(last) if next <= last => Err(Error::Store(format!(
            "record for '{}' at {} is not after the latest record at {}",
            repo_id, next, last
        ))),
        _ => Ok(()),
    }
}

/// Persistent store backed by a single redb file
pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path).map_err(Error::store)?;
        debug!("Opened health store at {}", path.display());
        Ok(Self { db })
    }
}

impl HealthStore for RedbStore {
    fn append(&self, record: &HealthRecord) -> Result<()> {
        let ts = record.timestamp.timestamp_millis();
        let bytes = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write().map_err(Error::store)?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE).map_err(Error::store)?;
            let repo_id = record.repo_id.as_str();
            let last = match table
                .range((repo_id, i64::MIN)..=(repo_id, i64::MAX))
                .map_err(Error::store)?
                .next_back()
            {
                Some(entry) => Some(entry.map_err(Error::store)?.0.value().1),
                None => None,
            };
            check_order(repo_id, last, ts)?;
            table
                .insert((record.repo_id.as_str(), ts), bytes.as_slice())
                .map_err(Error::store)?;
        }
        write_txn.commit().map_err(Error::store)?;
        Ok(())
    }

    fn history(&self, repo_id: &str, since: Option<DateTime<Utc>>) -> Result<Vec<HealthRecord>> {
        let read_txn = self.db.begin_read().map_err(Error::store)?;
        let table = match read_txn.open_table(RECORDS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(Error::store(e)),
        };

        let from = since.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);
        let mut records = Vec::new();
        for entry in table
            .range((repo_id, from)..=(repo_id, i64::MAX))
            .map_err(Error::store)?
        {
            let (_, value) = entry.map_err(Error::store)?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    fn latest(&self, repo_id: &str) -> Result<Option<HealthRecord>> {
        let read_txn = self.db.begin_read().map_err(Error::store)?;
        let table = match read_txn.open_table(RECORDS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(Error::store(e)),
        };

        let last = table
            .range((repo_id, i64::MIN)..=(repo_id, i64::MAX))
            .map_err(Error::store)?
            .next_back();
        match last {
            Some(entry) => {
                let (_, value) = entry.map_err(Error::store)?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }

    fn repositories(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read().map_err(Error::store)?;
        let table = match read_txn.open_table(RECORDS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(Error::store(e)),
        };

        let mut repos = BTreeSet::new();
        for entry in table.iter().map_err(Error::store)? {
            let (key, _) = entry.map_err(Error::store)?;
            repos.insert(key.value().0.to_string());
        }
        Ok(repos.into_iter().collect())
    }
}

/// Volatile store with the same ordering rules, for tests and dry runs
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, Vec<HealthRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HealthStore for InMemoryStore {
    fn append(&self, record: &HealthRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::store("record lock poisoned"))?;
        let history = records.entry(record.repo_id.clone()).or_default();
        let last = history.last().map(|r| r.timestamp.timestamp_millis());
        check_order(&record.repo_id, last, record.timestamp.timestamp_millis())?;
        history.push(record.clone());
        Ok(())
    }

    fn history(&self, repo_id: &str, since: Option<DateTime<Utc>>) -> Result<Vec<HealthRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| Error::store("record lock poisoned"))?;
        Ok(records
            .get(repo_id)
            .map(|history| {
                history
                    .iter()
                    .filter(|r| since.map_or(true, |s| r.timestamp >= s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn latest(&self, repo_id: &str) -> Result<Option<HealthRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| Error::store("record lock poisoned"))?;
        Ok(records.get(repo_id).and_then(|h| h.last().cloned()))
    }

    fn repositories(&self) -> Result<Vec<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| Error::store("record lock poisoned"))?;
        Ok(records.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationResult;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(repo: &str, millis: i64, score: f64) -> HealthRecord {
        HealthRecord {
            repo_id: repo.to_string(),
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            result: ValidationResult {
                score,
                ..Default::default()
            },
        }
    }

    fn exercise(store: &dyn HealthStore) {
        store.append(&record("beta", 1_000, 0.5)).unwrap();
        store.append(&record("alpha", 2_000, 0.6)).unwrap();
        store.append(&record("alpha", 3_000, 0.7)).unwrap();
        store.append(&record("alpha", 4_000, 0.8)).unwrap();

        // Append-only, strictly increasing per repository
        assert!(store.append(&record("alpha", 4_000, 0.9)).is_err());
        assert!(store.append(&record("alpha", 1_500, 0.9)).is_err());

        let history = store.history("alpha", None).unwrap();
        let scores: Vec<f64> = history.iter().map(|r| r.result.score).collect();
        assert_eq!(scores, vec![0.6, 0.7, 0.8]);

        let since = Utc.timestamp_millis_opt(3_000).unwrap();
        assert_eq!(store.history("alpha", Some(since)).unwrap().len(), 2);

        assert_eq!(store.latest("alpha").unwrap().unwrap().result.score, 0.8);
        assert!(store.latest("gamma").unwrap().is_none());
        assert_eq!(store.repositories().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_in_memory_store() {
        exercise(&InMemoryStore::new());
    }

    #[test]
    fn test_redb_store() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("nested/health.redb")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_redb_store_empty() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("health.redb")).unwrap();
        assert!(store.history("alpha", None).unwrap().is_empty());
        assert!(store.latest("alpha").unwrap().is_none());
        assert!(store.repositories().unwrap().is_empty());
    }

    #[test]
    fn test_redb_store_persists_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("health.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.append(&record("alpha", 1_000, 0.4)).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.history("alpha", None).unwrap().len(), 1);
    }
}
