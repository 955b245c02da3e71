//! Concurrent import tests
//!
//! Several coordinators run against the same store at once. Coordinators
//! that share one identifier lock registry must never both see an
//! identifier as absent.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use fieldline_core::adapters::duckdb::DuckDbRepository;
use fieldline_core::adapters::memory::MemoryStore;
use fieldline_core::config::HeaderMappings;
use fieldline_core::ports::{BatchLedger, ChangeHistory, RecordStore};
use fieldline_core::services::{CsvParser, IdentifierLocks, ImportCoordinator, ImportOptions};
use fieldline_core::{BatchCounters, BatchStatus};

/// Number of coordinators racing each other
const THREAD_COUNT: usize = 4;

/// Records per source file
const RECORDS: usize = 60;

fn coordinator<S>(store: &Arc<S>, locks: &Arc<IdentifierLocks>) -> ImportCoordinator
where
    S: RecordStore + BatchLedger + ChangeHistory + 'static,
{
    ImportCoordinator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::clone(locks),
        CsvParser::new(HeaderMappings::default()),
        ImportOptions {
            chunk_size: 7,
            workers: 3,
            default_year: 2025,
        },
    )
}

fn source(ids: impl Iterator<Item = usize>, status: &str) -> String {
    let mut text = String::from("Property ID,Status\n");
    for i in ids {
        text.push_str(&format!("P{:03},{}\n", i, status));
    }
    text
}

/// Run one import per thread, all released at the same time
fn race<S>(store: &Arc<S>, sources: Vec<String>) -> Vec<BatchCounters>
where
    S: RecordStore + BatchLedger + ChangeHistory + 'static,
{
    let locks = Arc::new(IdentifierLocks::new());
    let barrier = Arc::new(Barrier::new(sources.len()));

    let handles: Vec<_> = sources
        .into_iter()
        .enumerate()
        .map(|(n, text)| {
            let coordinator = coordinator(store, &locks);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                coordinator
                    .import_text(&format!("RACE_{}", n), &format!("race{}.csv", n), &text)
                    .unwrap()
            })
        })
        .collect();

    let counters = handles
        .into_iter()
        .map(|h| {
            let outcome = h.join().unwrap();
            assert_eq!(outcome.batch.status, BatchStatus::Completed);
            outcome.batch.counters
        })
        .collect();

    assert_eq!(locks.held_count(), 0);
    counters
}

/// Every thread imports the same identifiers with its own status value.
/// Exactly one batch may classify each identifier as NEW; every later
/// batch sees the committed record and reports it CHANGED.
fn overlapping_batches_serialize<S>(store: Arc<S>)
where
    S: RecordStore + BatchLedger + ChangeHistory + 'static,
{
    let sources = (0..THREAD_COUNT)
        .map(|n| source(0..RECORDS, &format!("status {}", n)))
        .collect();
    let counters = race(&store, sources);

    let new: u64 = counters.iter().map(|c| c.new).sum();
    let changed: u64 = counters.iter().map(|c| c.changed).sum();
    let errors: u64 = counters.iter().map(|c| c.error).sum();

    assert_eq!(new, RECORDS as u64);
    assert_eq!(changed, (RECORDS * (THREAD_COUNT - 1)) as u64);
    assert_eq!(errors, 0);
    assert_eq!(store.count_all().unwrap(), RECORDS as u64);

    // The history chain of every record is unbroken: each change starts
    // from the value the previous change ended with
    for i in 0..RECORDS {
        let mut events = store.changes_for_record(&format!("P{:03}", i)).unwrap();
        assert_eq!(events.len(), THREAD_COUNT - 1);
        events.sort_by_key(|e| e.detected_at);
        for pair in events.windows(2) {
            assert_eq!(pair[0].new_value, pair[1].old_value);
        }
        let last = store.get(&format!("P{:03}", i)).unwrap().unwrap();
        assert_eq!(last.status, events[events.len() - 1].new_value);
    }
}

#[test]
fn test_overlapping_batches_serialize_memory() {
    overlapping_batches_serialize(Arc::new(MemoryStore::new()));
}

#[test]
fn test_overlapping_batches_serialize_duckdb() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DuckDbRepository::new(&temp_dir.path().join("race.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    overlapping_batches_serialize(Arc::new(repo));
}

#[test]
fn test_disjoint_batches_run_concurrently() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DuckDbRepository::new(&temp_dir.path().join("disjoint.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    let store = Arc::new(repo);

    let sources = (0..THREAD_COUNT)
        .map(|n| source(n * RECORDS..(n + 1) * RECORDS, "Pole Permission: Approved"))
        .collect();
    let counters = race(&store, sources);

    for c in &counters {
        assert_eq!(c.new, RECORDS as u64);
        assert_eq!(c.total, RECORDS as u64);
    }
    assert_eq!(store.count_all().unwrap(), (RECORDS * THREAD_COUNT) as u64);
    assert_eq!(store.list_batches().unwrap().len(), THREAD_COUNT);
}
