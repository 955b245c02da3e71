//! In-memory store implementing every storage port
//!
//! Test double for the DuckDB adapter. Supports failure injection so error
//! isolation can be exercised without a real database.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::result::{Error, Result};
use crate::domain::{ChangeEvent, ImportBatch, Record};
use crate::ports::{BatchLedger, ChangeHistory, RecordStore, DEFAULT_MAX_CHUNK_SIZE};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::store("in-memory store lock poisoned"))
}

/// In-memory record store, batch ledger and change history
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Record>>,
    batches: Mutex<Vec<ImportBatch>>,
    events: Mutex<Vec<ChangeEvent>>,
    failing: Mutex<HashSet<String>>,
    fail_chunks: AtomicBool,
    max_chunk_size: usize,
    chunk_commits: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }

    /// Store that reports a smaller atomic write limit
    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            batches: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            fail_chunks: AtomicBool::new(false),
            max_chunk_size: max_chunk_size.max(1),
            chunk_commits: AtomicUsize::new(0),
        }
    }

    /// Make every access to `identifier` fail with a store error
    pub fn fail_identifier(&self, identifier: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(identifier.to_string());
        }
    }

    /// Make multi-record commits fail as a whole (single upserts still work)
    pub fn fail_chunk_commits(&self, fail: bool) {
        self.fail_chunks.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `upsert_chunk` calls
    pub fn chunk_commits(&self) -> usize {
        self.chunk_commits.load(Ordering::SeqCst)
    }

    fn check(&self, identifier: &str) -> Result<()> {
        if lock(&self.failing)?.contains(identifier) {
            return Err(Error::store(format!("simulated failure for {}", identifier)));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, identifier: &str) -> Result<Option<Record>> {
        self.check(identifier)?;
        Ok(lock(&self.records)?.get(identifier).cloned())
    }

    fn upsert(&self, record: &Record) -> Result<()> {
        self.check(&record.identifier)?;
        lock(&self.records)?.insert(record.identifier.clone(), record.clone());
        Ok(())
    }

    fn count_all(&self) -> Result<u64> {
        Ok(lock(&self.records)?.len() as u64)
    }

    fn identifiers(&self) -> Result<Vec<String>> {
        Ok(lock(&self.records)?.keys().cloned().collect())
    }

    fn upsert_chunk(&self, records: &[Record]) -> Result<()> {
        if records.len() > self.max_chunk_size {
            return Err(Error::store(format!(
                "chunk of {} exceeds limit of {}",
                records.len(),
                self.max_chunk_size
            )));
        }
        if self.fail_chunks.load(Ordering::SeqCst) {
            return Err(Error::store("simulated chunk commit failure"));
        }
        // All or nothing: validate every record before touching the map
        for record in records {
            self.check(&record.identifier)?;
        }
        let mut map = lock(&self.records)?;
        for record in records {
            map.insert(record.identifier.clone(), record.clone());
        }
        self.chunk_commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }
}

impl BatchLedger for MemoryStore {
    fn create_batch(&self, batch: &ImportBatch) -> Result<()> {
        let mut batches = lock(&self.batches)?;
        if batches.iter().any(|b| b.id == batch.id) {
            return Err(Error::BatchIdCollision(batch.id.clone()));
        }
        batches.push(batch.clone());
        Ok(())
    }

    fn get_batch(&self, batch_id: &str) -> Result<Option<ImportBatch>> {
        Ok(lock(&self.batches)?.iter().find(|b| b.id == batch_id).cloned())
    }

    fn update_batch(&self, batch: &ImportBatch) -> Result<()> {
        let mut batches = lock(&self.batches)?;
        let slot = batches
            .iter_mut()
            .find(|b| b.id == batch.id)
            .ok_or_else(|| Error::not_found(format!("import batch {}", batch.id)))?;
        *slot = batch.clone();
        Ok(())
    }

    fn list_batches(&self) -> Result<Vec<ImportBatch>> {
        Ok(lock(&self.batches)?.clone())
    }
}

impl ChangeHistory for MemoryStore {
    fn append_changes(&self, events: &[ChangeEvent]) -> Result<()> {
        lock(&self.events)?.extend_from_slice(events);
        Ok(())
    }

    fn changes_for_record(&self, identifier: &str) -> Result<Vec<ChangeEvent>> {
        Ok(lock(&self.events)?
            .iter()
            .filter(|e| e.record_identifier == identifier)
            .cloned()
            .collect())
    }

    fn changes_for_batch(&self, batch_id: &str) -> Result<Vec<ChangeEvent>> {
        Ok(lock(&self.events)?
            .iter()
            .filter(|e| e.batch_id == batch_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalField;

    #[test]
    fn test_upsert_replaces_by_identifier() {
        let store = MemoryStore::new();
        store.upsert(&Record::new("P1").with(CanonicalField::Status, "A")).unwrap();
        store.upsert(&Record::new("P1").with(CanonicalField::Status, "B")).unwrap();

        assert_eq!(store.count_all().unwrap(), 1);
        assert_eq!(store.get("P1").unwrap().unwrap().status, "B");
    }

    #[test]
    fn test_chunk_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.fail_identifier("P2");

        let chunk = vec![Record::new("P1"), Record::new("P2")];
        assert!(store.upsert_chunk(&chunk).is_err());
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[test]
    fn test_chunk_limit_enforced() {
        let store = MemoryStore::with_max_chunk_size(1);
        let chunk = vec![Record::new("P1"), Record::new("P2")];
        assert!(store.upsert_chunk(&chunk).is_err());
        assert!(store.upsert_chunk(&chunk[..1]).is_ok());
        assert_eq!(store.chunk_commits(), 1);
    }

    #[test]
    fn test_batch_id_collision() {
        let store = MemoryStore::new();
        store.create_batch(&ImportBatch::new("B1", "a.csv")).unwrap();
        let err = store.create_batch(&ImportBatch::new("B1", "b.csv")).unwrap_err();
        assert!(matches!(err, Error::BatchIdCollision(id) if id == "B1"));
    }

    #[test]
    fn test_update_unknown_batch() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_batch(&ImportBatch::new("nope", "a.csv")),
            Err(Error::NotFound(_))
        ));
    }
}
