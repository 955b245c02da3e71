//! Import coordinator - drives one snapshot batch end to end
//!
//! parse → collapse in-file duplicates → per chunk: lock identifiers,
//! look up + classify on the worker pool, commit writes, append change
//! history, persist ledger counters → close the batch.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{
    snapshot_date_from_filename, ChangeEvent, ChunkTally, ImportBatch, Record, RecordError,
};
use crate::ports::{BatchLedger, ChangeHistory, RecordStore};
use crate::services::detector::{classify, ChangeKind, Classification};
use crate::services::locks::IdentifierLocks;
use crate::services::parser::{CsvParser, ParsedCsv};

/// Tuning knobs for one coordinator
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Records per write chunk; capped by the store's atomic write limit
    pub chunk_size: usize,
    /// Worker threads for lookup + classification
    pub workers: usize,
    /// Year assumed for filenames carrying only month and day
    pub default_year: i32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ImportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            workers: config.workers,
            default_year: config.default_year,
        }
    }
}

/// Cooperative cancellation flag shared with the caller
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Stop scheduling new chunks. The chunk in flight still finishes.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A parsed source, ready to import. Building one touches no store.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub source_file: String,
    /// SHA-256 of the source text, hex encoded
    pub source_hash: String,
    pub snapshot_date: Option<NaiveDate>,
    pub parsed: ParsedCsv,
}

/// Result of a batch run that reached a terminal state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub batch: ImportBatch,
    /// Change events appended by this batch
    pub change_events: u64,
    /// Chunks committed before the batch closed
    pub chunks: u64,
}

type ProgressFn = dyn Fn(&ImportBatch) + Send + Sync;

/// A classified write waiting for its commit
struct PendingWrite {
    events: Vec<ChangeEvent>,
    /// Stored version before this batch; `None` for a new record
    previous: Option<Record>,
}

/// Orchestrates parse → classify → upsert → ledger/history for one batch
pub struct ImportCoordinator {
    store: Arc<dyn RecordStore>,
    ledger: Arc<dyn BatchLedger>,
    history: Arc<dyn ChangeHistory>,
    locks: Arc<IdentifierLocks>,
    parser: CsvParser,
    options: ImportOptions,
    abort: AbortHandle,
    progress: Option<Box<ProgressFn>>,
}

impl ImportCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        ledger: Arc<dyn BatchLedger>,
        history: Arc<dyn ChangeHistory>,
        locks: Arc<IdentifierLocks>,
        parser: CsvParser,
        options: ImportOptions,
    ) -> Self {
        Self {
            store,
            ledger,
            history,
            locks,
            parser,
            options,
            abort: AbortHandle::default(),
            progress: None,
        }
    }

    /// Called with the batch state after every committed chunk
    pub fn with_progress(mut self, progress: impl Fn(&ImportBatch) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Handle that aborts the batch currently being run
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Parse source text without touching any store
    pub fn prepare(&self, source_file: &str, text: &str) -> Result<PreparedImport> {
        let parsed = self.parser.parse(text)?;
        Ok(PreparedImport {
            source_file: source_file.to_string(),
            source_hash: format!("{:x}", Sha256::digest(text.as_bytes())),
            snapshot_date: snapshot_date_from_filename(source_file, self.options.default_year),
            parsed,
        })
    }

    /// Earlier batches that imported exactly the same content
    pub fn previous_imports_of(&self, prepared: &PreparedImport) -> Result<Vec<ImportBatch>> {
        Ok(self
            .ledger
            .list_batches()?
            .into_iter()
            .filter(|b| b.source_hash.as_deref() == Some(prepared.source_hash.as_str()))
            .collect())
    }

    /// Import a CSV file. The ledger entry is created before the file is
    /// read, so an unreadable file leaves a `failed` batch behind.
    pub fn import_file(&self, batch_id: &str, path: &Path) -> Result<ImportOutcome> {
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut batch = ImportBatch::new(batch_id, &source_file);
        self.ledger.create_batch(&batch)?;

        let prepared = std::fs::read_to_string(path)
            .map_err(|e| Error::unreadable(format!("{}: {}", path.display(), e)))
            .and_then(|text| self.prepare(&source_file, &text));
        self.run_created(&mut batch, prepared)
    }

    /// Import CSV text under the given source name
    pub fn import_text(&self, batch_id: &str, source_file: &str, text: &str) -> Result<ImportOutcome> {
        let mut batch = ImportBatch::new(batch_id, source_file);
        self.ledger.create_batch(&batch)?;
        let prepared = self.prepare(source_file, text);
        self.run_created(&mut batch, prepared)
    }

    /// Import a source that was already parsed (e.g. after a preview)
    pub fn import_prepared(&self, batch_id: &str, prepared: &PreparedImport) -> Result<ImportOutcome> {
        let mut batch = ImportBatch::new(batch_id, &prepared.source_file);
        batch.source_hash = Some(prepared.source_hash.clone());
        batch.snapshot_date = prepared.snapshot_date;
        self.ledger.create_batch(&batch)?;
        self.run(&mut batch, prepared)
    }

    /// Record a batch whose source failed to prepare, so the ledger still
    /// shows the attempt. The batch goes straight from `pending` to `failed`.
    pub fn record_rejected(
        &self,
        batch_id: &str,
        source_file: &str,
        error: &Error,
    ) -> Result<ImportBatch> {
        let mut batch = ImportBatch::new(batch_id, source_file);
        self.ledger.create_batch(&batch)?;
        batch.store_count_before = self.store.count_all().ok();
        batch.fail(error.to_string())?;
        self.ledger.update_batch(&batch)?;
        warn!(batch_id = %batch.id, error = %error, "Source rejected, batch failed");
        Ok(batch)
    }

    fn run_created(
        &self,
        batch: &mut ImportBatch,
        prepared: Result<PreparedImport>,
    ) -> Result<ImportOutcome> {
        match prepared {
            Ok(prepared) => {
                batch.source_hash = Some(prepared.source_hash.clone());
                batch.snapshot_date = prepared.snapshot_date;
                self.run(batch, &prepared)
            }
            Err(e) => {
                warn!(batch_id = %batch.id, error = %e, "Source unreadable, failing batch");
                batch.store_count_before = self.store.count_all().ok();
                batch.fail(e.to_string())?;
                self.ledger.update_batch(batch)?;
                Err(e)
            }
        }
    }

    fn run(&self, batch: &mut ImportBatch, prepared: &PreparedImport) -> Result<ImportOutcome> {
        match self.store.count_all() {
            Ok(count) => batch.store_count_before = Some(count),
            Err(e) => {
                warn!(batch_id = %batch.id, error = %e, "Store unavailable, failing batch");
                batch.fail(e.to_string())?;
                self.ledger.update_batch(batch)?;
                return Err(e);
            }
        }

        let (records, superseded) = collapse_duplicates(&prepared.parsed.records);

        if records.is_empty() {
            info!(batch_id = %batch.id, "No valid rows, failing batch");
            batch.fail("source has no rows with an identifier")?;
            self.ledger.update_batch(batch)?;
            return Ok(self.outcome(batch, 0, 0));
        }

        if self.abort.is_aborted() {
            batch.fail(Error::Aborted("stopped before the first chunk".to_string()).to_string())?;
            self.ledger.update_batch(batch)?;
            return Ok(self.outcome(batch, 0, 0));
        }

        batch.start(records.len() as u64, superseded)?;
        self.ledger.update_batch(batch)?;

        let chunk_size = self
            .options
            .chunk_size
            .min(self.store.max_chunk_size())
            .max(1);
        info!(
            batch_id = %batch.id,
            source = %batch.source_file,
            records = records.len(),
            superseded,
            chunk_size,
            "Import started"
        );

        let mut change_events = 0u64;
        let mut chunks = 0u64;
        for chunk in records.chunks(chunk_size) {
            if self.abort.is_aborted() {
                warn!(batch_id = %batch.id, chunks, "Import aborted, no further chunks scheduled");
                batch.fail(Error::Aborted(format!("stopped after {} chunks", chunks)).to_string())?;
                self.ledger.update_batch(batch)?;
                return Ok(self.outcome(batch, change_events, chunks));
            }

            match self.process_chunk(batch, chunk) {
                Ok(events) => change_events += events,
                Err(e) => {
                    warn!(batch_id = %batch.id, error = %e, "Chunk failed unrecoverably");
                    batch.fail(e.to_string())?;
                    self.ledger.update_batch(batch)?;
                    return Err(e);
                }
            }
            chunks += 1;

            if let Some(progress) = &self.progress {
                progress(batch);
            }
        }

        batch.finish()?;
        self.ledger.update_batch(batch)?;
        info!(
            batch_id = %batch.id,
            status = %batch.status,
            new = batch.counters.new,
            changed = batch.counters.changed,
            unchanged = batch.counters.unchanged,
            errors = batch.counters.error,
            "Import finished"
        );

        Ok(self.outcome(batch, change_events, chunks))
    }

    fn outcome(&self, batch: &ImportBatch, change_events: u64, chunks: u64) -> ImportOutcome {
        ImportOutcome {
            batch: batch.clone(),
            change_events,
            chunks,
        }
    }

    /// Classify and commit one chunk while holding its identifiers.
    ///
    /// Returns the number of change events appended. Per-record store
    /// failures are counted on the batch. If the history append fails after
    /// the commit, changed records are put back to their stored version and
    /// counted as errors before the failure comes back as `Err`, so a later
    /// import still sees them as changed.
    fn process_chunk(&self, batch: &mut ImportBatch, chunk: &[Record]) -> Result<u64> {
        let identifiers: Vec<String> = chunk.iter().map(|r| r.identifier.clone()).collect();
        let _guard = self.locks.acquire(&identifiers)?;

        let now = Utc::now();
        let mut tally = ChunkTally::default();
        let mut writes: Vec<Record> = Vec::new();
        let mut pending: Vec<PendingWrite> = Vec::new();

        for (record, classified) in chunk.iter().zip(self.classify_chunk(chunk)) {
            match classified {
                Err(e) => {
                    warn!(identifier = %record.identifier, error = %e, "Lookup failed");
                    tally.errors.push(RecordError {
                        identifier: record.identifier.clone(),
                        message: e.to_string(),
                    });
                }
                Ok((Classification { kind: ChangeKind::Unchanged, .. }, _)) => tally.unchanged += 1,
                Ok((Classification { diffs, .. }, previous)) => {
                    let events = diffs
                        .iter()
                        .map(|d| ChangeEvent::from_diff(&record.identifier, &batch.id, d, now))
                        .collect();
                    writes.push(record.stamped(&batch.source_file, &batch.id, now));
                    pending.push(PendingWrite { events, previous });
                }
            }
        }

        let committed = self.commit(&writes);

        let mut landed: Vec<(&Record, PendingWrite)> = Vec::new();
        for ((record, write), result) in writes.iter().zip(pending).zip(committed) {
            match result {
                Ok(()) => landed.push((record, write)),
                Err(e) => {
                    warn!(identifier = %record.identifier, error = %e, "Write failed");
                    tally.errors.push(RecordError {
                        identifier: record.identifier.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let events: Vec<ChangeEvent> = landed
            .iter()
            .flat_map(|(_, write)| write.events.iter().cloned())
            .collect();
        if !events.is_empty() {
            if let Err(e) = self.history.append_changes(&events) {
                warn!(batch_id = %batch.id, error = %e, "Change history append failed, restoring changed records");
                for (record, write) in landed {
                    match write.previous {
                        None => tally.new += 1,
                        Some(previous) => {
                            let message = match self.store.upsert(&previous) {
                                Ok(()) => format!("change history not recorded, previous version restored: {}", e),
                                Err(restore) => format!("change history not recorded, restore failed: {}", restore),
                            };
                            tally.errors.push(RecordError {
                                identifier: record.identifier.clone(),
                                message,
                            });
                        }
                    }
                }
                batch.record_chunk(tally)?;
                self.ledger.update_batch(batch)?;
                return Err(e);
            }
        }

        for (_, write) in &landed {
            match write.previous {
                None => tally.new += 1,
                Some(_) => tally.changed += 1,
            }
        }

        debug!(
            batch_id = %batch.id,
            records = chunk.len(),
            writes = writes.len(),
            new = tally.new,
            changed = tally.changed,
            unchanged = tally.unchanged,
            errors = tally.errors.len(),
            "Chunk committed"
        );

        batch.record_chunk(tally)?;
        self.ledger.update_batch(batch)?;
        Ok(events.len() as u64)
    }

    /// Commit writes atomically; if the chunk is rejected as a whole, retry
    /// record by record so only the failing records are lost.
    fn commit(&self, writes: &[Record]) -> Vec<Result<()>> {
        if writes.is_empty() {
            return Vec::new();
        }
        match self.store.upsert_chunk(writes) {
            Ok(()) => writes.iter().map(|_| Ok(())).collect(),
            Err(e) => {
                warn!(writes = writes.len(), error = %e, "Chunk commit rejected, retrying per record");
                writes.iter().map(|record| self.store.upsert(record)).collect()
            }
        }
    }

    /// Look up and classify every record of a chunk on the worker pool.
    /// Results come back in chunk order.
    fn classify_chunk(&self, chunk: &[Record]) -> Vec<Result<(Classification, Option<Record>)>> {
        let store = &self.store;
        let classify_one = |record: &Record| -> Result<(Classification, Option<Record>)> {
            let existing = store.get(&record.identifier)?;
            let classification = classify(record, existing.as_ref());
            Ok((classification, existing))
        };

        let workers = self.options.workers.max(1);
        if workers == 1 || chunk.len() < 2 {
            return chunk.iter().map(classify_one).collect();
        }

        let per_worker = chunk.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .chunks(per_worker)
                .map(|slice| (slice.len(), scope.spawn(move || slice.iter().map(classify_one).collect::<Vec<_>>())))
                .collect();

            handles
                .into_iter()
                .flat_map(|(len, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        (0..len)
                            .map(|_| Err(Error::store("classification worker panicked")))
                            .collect()
                    })
                })
                .collect()
        })
    }
}

/// Collapse rows sharing an identifier: the last row's values win, kept at
/// the position where the identifier first appeared. Returns the distinct
/// records and the number of superseded rows.
pub fn collapse_duplicates(records: &[Record]) -> (Vec<Record>, u64) {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut distinct: Vec<Record> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(record.identifier.as_str()) {
            Some(&index) => distinct[index] = record.clone(),
            None => {
                positions.insert(&record.identifier, distinct.len());
                distinct.push(record.clone());
            }
        }
    }

    let superseded = (records.len() - distinct.len()) as u64;
    (distinct, superseded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::config::HeaderMappings;
    use crate::domain::{BatchStatus, CanonicalField};

    const HEADER: &str = "Property ID,Pole Number,Status";

    /// History whose appends always fail; reads go to the wrapped store
    struct BrokenHistory(Arc<MemoryStore>);

    impl ChangeHistory for BrokenHistory {
        fn append_changes(&self, _events: &[ChangeEvent]) -> Result<()> {
            Err(Error::database("history table unavailable"))
        }

        fn changes_for_record(&self, identifier: &str) -> Result<Vec<ChangeEvent>> {
            self.0.changes_for_record(identifier)
        }

        fn changes_for_batch(&self, batch_id: &str) -> Result<Vec<ChangeEvent>> {
            self.0.changes_for_batch(batch_id)
        }
    }

    fn coordinator(store: &Arc<MemoryStore>, options: ImportOptions) -> ImportCoordinator {
        ImportCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(IdentifierLocks::new()),
            CsvParser::new(HeaderMappings::default()),
            options,
        )
    }

    fn csv(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_collapse_last_row_wins() {
        let rows = vec![
            Record::new("P3").with(CanonicalField::Status, "A"),
            Record::new("P1"),
            Record::new("P3").with(CanonicalField::Status, "B"),
        ];
        let (distinct, superseded) = collapse_duplicates(&rows);
        assert_eq!(superseded, 1);
        assert_eq!(distinct.len(), 2);
        assert_eq!(distinct[0].identifier, "P3");
        assert_eq!(distinct[0].status, "B");
    }

    #[test]
    fn test_small_chunks_commit_incrementally() {
        let store = Arc::new(MemoryStore::new());
        let options = ImportOptions {
            chunk_size: 2,
            workers: 3,
            ..Default::default()
        };
        let batches = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&batches);
        let coordinator = coordinator(&store, options)
            .with_progress(move |b| seen.lock().unwrap().push(b.counters.processed()));

        let text = csv(&["P1,,A", "P2,,B", "P3,,C", "P4,,D", "P5,,E"]);
        let outcome = coordinator.import_text("B1", "week1.csv", &text).unwrap();

        assert_eq!(outcome.chunks, 3);
        assert_eq!(store.chunk_commits(), 3);
        assert_eq!(*batches.lock().unwrap(), vec![2, 4, 5]);
        assert_eq!(outcome.batch.counters.new, 5);
    }

    #[test]
    fn test_chunk_size_capped_by_store_limit() {
        let store = Arc::new(MemoryStore::with_max_chunk_size(2));
        let coordinator = coordinator(&store, ImportOptions::default());

        let text = csv(&["P1,,A", "P2,,B", "P3,,C"]);
        let outcome = coordinator.import_text("B1", "week1.csv", &text).unwrap();

        assert_eq!(outcome.batch.status, BatchStatus::Completed);
        assert_eq!(outcome.chunks, 2);
        assert_eq!(outcome.batch.counters.error, 0);
    }

    #[test]
    fn test_rejected_chunk_falls_back_per_record() {
        let store = Arc::new(MemoryStore::new());
        store.fail_chunk_commits(true);
        let coordinator = coordinator(&store, ImportOptions::default());

        let outcome = coordinator
            .import_text("B1", "week1.csv", &csv(&["P1,,A", "P2,,B"]))
            .unwrap();

        assert_eq!(outcome.batch.counters.new, 2);
        assert_eq!(store.count_all().unwrap(), 2);
        assert_eq!(store.chunk_commits(), 0);
    }

    #[test]
    fn test_abort_before_processing_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(&store, ImportOptions::default());
        coordinator.abort_handle().abort();

        let outcome = coordinator
            .import_text("B1", "week1.csv", &csv(&["P1,,A"]))
            .unwrap();

        assert_eq!(outcome.batch.status, BatchStatus::Failed);
        assert_eq!(outcome.batch.counters.processed(), 0);
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[test]
    fn test_abort_mid_batch_keeps_partial_counts() {
        let store = Arc::new(MemoryStore::new());
        let options = ImportOptions {
            chunk_size: 1,
            workers: 1,
            ..Default::default()
        };
        let coordinator = coordinator(&store, options);
        let handle = coordinator.abort_handle();
        let coordinator = coordinator.with_progress(move |_| handle.abort());

        let outcome = coordinator
            .import_text("B1", "week1.csv", &csv(&["P1,,A", "P2,,B", "P3,,C"]))
            .unwrap();

        assert_eq!(outcome.batch.status, BatchStatus::Failed);
        assert_eq!(outcome.batch.counters.new, 1);
        assert_eq!(outcome.batch.counters.total, 3);
        assert_eq!(store.count_all().unwrap(), 1);

        let stored = store.get_batch("B1").unwrap().unwrap();
        assert_eq!(stored, outcome.batch);
    }

    #[test]
    fn test_prepare_hashes_and_dates() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(&store, ImportOptions::default());
        let prepared = coordinator
            .prepare("Lawley 2025-05-22.csv", &csv(&["P1,,A"]))
            .unwrap();

        assert_eq!(prepared.source_hash.len(), 64);
        assert_eq!(prepared.snapshot_date, NaiveDate::from_ymd_opt(2025, 5, 22));
        assert_eq!(store.list_batches().unwrap().len(), 0);
    }

    #[test]
    fn test_record_rejected() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(&store, ImportOptions::default());
        let err = coordinator.prepare("week1.csv", "").unwrap_err();

        let batch = coordinator.record_rejected("B1", "week1.csv", &err).unwrap();
        assert_eq!(batch.status, BatchStatus::Failed);
        assert_eq!(store.get_batch("B1").unwrap().unwrap(), batch);
    }

    #[test]
    fn test_previous_imports_by_hash() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(&store, ImportOptions::default());
        let text = csv(&["P1,,A"]);

        let prepared = coordinator.prepare("week1.csv", &text).unwrap();
        assert!(coordinator.previous_imports_of(&prepared).unwrap().is_empty());

        coordinator.import_prepared("B1", &prepared).unwrap();
        let previous = coordinator.previous_imports_of(&prepared).unwrap();
        assert_eq!(previous.len(), 1);
        assert_eq!(previous[0].id, "B1");
    }

    #[test]
    fn test_history_failure_restores_changed_records() {
        let store = Arc::new(MemoryStore::new());
        coordinator(&store, ImportOptions::default())
            .import_text("B1", "week1.csv", &csv(&["P1,,A", "P2,,B"]))
            .unwrap();

        let broken = ImportCoordinator::new(
            store.clone(),
            store.clone(),
            Arc::new(BrokenHistory(store.clone())),
            Arc::new(IdentifierLocks::new()),
            CsvParser::new(HeaderMappings::default()),
            ImportOptions::default(),
        );
        let week2 = csv(&["P1,,C", "P2,,B", "P3,,D"]);
        assert!(broken.import_text("B2", "week2.csv", &week2).is_err());

        // The ledger counts what this chunk did, including the new record
        let b2 = store.get_batch("B2").unwrap().unwrap();
        assert_eq!(b2.status, BatchStatus::Failed);
        assert_eq!(b2.counters.new, 1);
        assert_eq!(b2.counters.changed, 0);
        assert_eq!(b2.counters.unchanged, 1);
        assert_eq!(b2.counters.error, 1);
        assert_eq!(b2.errors[0].identifier, "P1");
        assert!(b2.errors[0].message.contains("change history not recorded"));

        // P1 is back to its stored version, so the next import still sees the change
        assert_eq!(store.get("P1").unwrap().unwrap().status, "A");
        let outcome = coordinator(&store, ImportOptions::default())
            .import_text("B3", "week2.csv", &week2)
            .unwrap();
        assert_eq!(outcome.batch.counters.changed, 1);
        assert_eq!(outcome.batch.counters.unchanged, 2);

        let events = store.changes_for_record("P1").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_value, "A");
        assert_eq!(events[0].new_value, "C");
    }
}
