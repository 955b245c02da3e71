//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, Connection, OptionalExt};
use tracing::warn;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    BatchCounters, BatchStatus, CanonicalField, ChangeEvent, ImportBatch, Provenance, Record,
    RecordError,
};
use crate::ports::{BatchLedger, ChangeHistory, RecordStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

const RECORD_COLUMNS: &str = "identifier, secondary_external_id, structure_number, drop_number, \
     status, flow_groups, section_list, pon_group, location_summary, address, field_agent_name, \
     last_modified_by, last_modified_date, source_file, import_batch_id, last_updated";

const BATCH_COLUMNS: &str = "batch_id, source_file, source_hash, snapshot_date, status, \
     created_at, completed_at, total_count, new_count, changed_count, unchanged_count, \
     error_count, superseded_count, errors, failure_reason, store_count_before";

const EVENT_COLUMNS: &str =
    "event_id, record_identifier, batch_id, field, old_value, new_value, detected_at";

/// DuckDB-backed record store, batch ledger and change history
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file.
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock. Does not migrate; call `ensure_schema` afterwards.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    })
                }
                Err(e) if is_retryable_error(&e.to_string()) && attempt + 1 < MAX_RETRIES => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    warn!(
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Database busy, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Non-persistent database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off so cached extensions are never picked up
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("connection lock poisoned"))
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure the schema exists
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Size of the database file in bytes (0 for in-memory databases)
    pub fn get_db_size(&self) -> Result<u64> {
        match &self.db_path {
            Some(path) => Ok(std::fs::metadata(path)?.len()),
            None => Ok(0),
        }
    }

    /// Number of batches per status
    pub fn count_batches_by_status(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM sys_import_batches GROUP BY status ORDER BY status",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_change_events(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_change_events", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_events(&self, filter_column: &str, value: &str, order: &str) -> Result<Vec<ChangeEvent>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM sys_change_events WHERE {} = ? ORDER BY {}",
            EVENT_COLUMNS, filter_column, order
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([value], |row| {
            Ok(RawEvent {
                id: row.get(0)?,
                record_identifier: row.get(1)?,
                batch_id: row.get(2)?,
                field: row.get(3)?,
                old_value: row.get(4)?,
                new_value: row.get(5)?,
                detected_at: row.get(6)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }
}

fn upsert_record(conn: &Connection, record: &Record) -> Result<()> {
    let provenance = record.provenance.as_ref();
    conn.execute(
        &format!(
            "INSERT INTO sys_records ({})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (identifier) DO UPDATE SET
                secondary_external_id = EXCLUDED.secondary_external_id,
                structure_number = EXCLUDED.structure_number,
                drop_number = EXCLUDED.drop_number,
                status = EXCLUDED.status,
                flow_groups = EXCLUDED.flow_groups,
                section_list = EXCLUDED.section_list,
                pon_group = EXCLUDED.pon_group,
                location_summary = EXCLUDED.location_summary,
                address = EXCLUDED.address,
                field_agent_name = EXCLUDED.field_agent_name,
                last_modified_by = EXCLUDED.last_modified_by,
                last_modified_date = EXCLUDED.last_modified_date,
                source_file = EXCLUDED.source_file,
                import_batch_id = EXCLUDED.import_batch_id,
                last_updated = EXCLUDED.last_updated",
            RECORD_COLUMNS
        ),
        params![
            record.identifier,
            record.secondary_external_id,
            record.structure_number,
            record.drop_number,
            record.status,
            record.flow_groups,
            record.section_list,
            record.pon_group,
            record.location_summary,
            record.address,
            record.field_agent_name,
            record.last_modified_by,
            record.last_modified_date,
            provenance.map(|p| p.source_file.clone()),
            provenance.map(|p| p.import_batch_id.clone()),
            provenance.map(|p| p.last_updated.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &duckdb::Row) -> duckdb::Result<Record> {
    // Columns 0..13 follow CanonicalField::ALL, then provenance
    let mut record = Record::default();
    for (index, field) in CanonicalField::ALL.into_iter().enumerate() {
        record.set(field, row.get(index)?);
    }

    let source_file: Option<String> = row.get(13)?;
    let batch_id: Option<String> = row.get(14)?;
    let last_updated: Option<String> = row.get(15)?;
    record.provenance = match (source_file, batch_id, last_updated) {
        (Some(source_file), Some(import_batch_id), Some(at)) => Some(Provenance {
            source_file,
            import_batch_id,
            last_updated: parse_timestamp(&at),
        }),
        _ => None,
    };
    Ok(record)
}

impl RecordStore for DuckDbRepository {
    fn get(&self, identifier: &str) -> Result<Option<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_records WHERE identifier = ?",
            RECORD_COLUMNS
        ))?;
        let mut rows = stmt.query([identifier])?;
        let record = match rows.next()? {
            Some(row) => Some(row_to_record(row)?),
            None => None,
        };
        Ok(record)
    }

    fn upsert(&self, record: &Record) -> Result<()> {
        let conn = self.conn()?;
        upsert_record(&conn, record)
    }

    fn count_all(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn identifiers(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT identifier FROM sys_records ORDER BY identifier")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// One transaction per chunk: either every record lands or none does
    fn upsert_chunk(&self, records: &[Record]) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        for record in records {
            if let Err(e) = upsert_record(&conn, record) {
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(e);
            }
        }
        conn.execute_batch("COMMIT")?;
        Ok(())
    }
}

/// Batch row as stored, before status/JSON decoding
struct RawBatch {
    id: String,
    source_file: String,
    source_hash: Option<String>,
    snapshot_date: Option<String>,
    status: String,
    created_at: String,
    completed_at: Option<String>,
    counts: [i64; 6],
    errors: String,
    failure_reason: Option<String>,
    store_count_before: Option<i64>,
}

impl RawBatch {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_file: row.get(1)?,
            source_hash: row.get(2)?,
            snapshot_date: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            completed_at: row.get(6)?,
            counts: [
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
                row.get(11)?,
                row.get(12)?,
            ],
            errors: row.get(13)?,
            failure_reason: row.get(14)?,
            store_count_before: row.get(15)?,
        })
    }

    fn into_batch(self) -> Result<ImportBatch> {
        let status = BatchStatus::parse(&self.status).ok_or_else(|| {
            Error::database(format!("batch {} has unknown status '{}'", self.id, self.status))
        })?;
        let errors: Vec<RecordError> = serde_json::from_str(&self.errors)?;
        let [total, new, changed, unchanged, error, superseded] = self.counts.map(|c| c as u64);

        Ok(ImportBatch {
            id: self.id,
            source_file: self.source_file,
            source_hash: self.source_hash,
            snapshot_date: self
                .snapshot_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            status,
            created_at: parse_timestamp(&self.created_at),
            completed_at: self.completed_at.as_deref().map(parse_timestamp),
            counters: BatchCounters {
                total,
                new,
                changed,
                unchanged,
                error,
                superseded,
            },
            errors,
            failure_reason: self.failure_reason,
            store_count_before: self.store_count_before.map(|c| c as u64),
        })
    }
}

impl BatchLedger for DuckDbRepository {
    fn create_batch(&self, batch: &ImportBatch) -> Result<()> {
        let conn = self.conn()?;
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_import_batches WHERE batch_id = ?",
            [batch.id.as_str()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(Error::BatchIdCollision(batch.id.clone()));
        }

        let c = &batch.counters;
        conn.execute(
            &format!(
                "INSERT INTO sys_import_batches ({})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                BATCH_COLUMNS
            ),
            params![
                batch.id,
                batch.source_file,
                batch.source_hash,
                batch.snapshot_date.map(|d| d.format("%Y-%m-%d").to_string()),
                batch.status.as_str(),
                batch.created_at.to_rfc3339(),
                batch.completed_at.map(|t| t.to_rfc3339()),
                c.total as i64,
                c.new as i64,
                c.changed as i64,
                c.unchanged as i64,
                c.error as i64,
                c.superseded as i64,
                serde_json::to_string(&batch.errors)?,
                batch.failure_reason,
                batch.store_count_before.map(|c| c as i64),
            ],
        )?;
        Ok(())
    }

    fn get_batch(&self, batch_id: &str) -> Result<Option<ImportBatch>> {
        let raw = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {} FROM sys_import_batches WHERE batch_id = ?",
                    BATCH_COLUMNS
                ),
                [batch_id],
                RawBatch::from_row,
            )
            .optional()?;
        raw.map(RawBatch::into_batch).transpose()
    }

    fn update_batch(&self, batch: &ImportBatch) -> Result<()> {
        let conn = self.conn()?;
        let c = &batch.counters;
        let updated = conn.execute(
            "UPDATE sys_import_batches SET
                source_hash = ?, snapshot_date = ?, status = ?, completed_at = ?,
                total_count = ?, new_count = ?, changed_count = ?, unchanged_count = ?,
                error_count = ?, superseded_count = ?, errors = ?, failure_reason = ?,
                store_count_before = ?
             WHERE batch_id = ?",
            params![
                batch.source_hash,
                batch.snapshot_date.map(|d| d.format("%Y-%m-%d").to_string()),
                batch.status.as_str(),
                batch.completed_at.map(|t| t.to_rfc3339()),
                c.total as i64,
                c.new as i64,
                c.changed as i64,
                c.unchanged as i64,
                c.error as i64,
                c.superseded as i64,
                serde_json::to_string(&batch.errors)?,
                batch.failure_reason,
                batch.store_count_before.map(|c| c as i64),
                batch.id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("import batch {}", batch.id)));
        }
        Ok(())
    }

    fn list_batches(&self) -> Result<Vec<ImportBatch>> {
        let raw = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sys_import_batches ORDER BY created_at, batch_id",
                BATCH_COLUMNS
            ))?;
            let rows = stmt.query_map([], RawBatch::from_row)?;
            let mut raw = Vec::new();
            for row in rows {
                raw.push(row?);
            }
            raw
        };
        raw.into_iter().map(RawBatch::into_batch).collect()
    }
}

struct RawEvent {
    id: String,
    record_identifier: String,
    batch_id: String,
    field: String,
    old_value: String,
    new_value: String,
    detected_at: String,
}

impl RawEvent {
    fn into_event(self) -> Result<ChangeEvent> {
        let field = CanonicalField::parse(&self.field)
            .ok_or_else(|| Error::database(format!("unknown field '{}'", self.field)))?;
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::database(format!("bad event id {}: {}", self.id, e)))?;
        Ok(ChangeEvent {
            id,
            record_identifier: self.record_identifier,
            batch_id: self.batch_id,
            field,
            old_value: self.old_value,
            new_value: self.new_value,
            detected_at: parse_timestamp(&self.detected_at),
        })
    }
}

impl ChangeHistory for DuckDbRepository {
    fn append_changes(&self, events: &[ChangeEvent]) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        let sql = format!(
            "INSERT INTO sys_change_events ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            EVENT_COLUMNS
        );
        for event in events {
            let inserted = conn.execute(
                &sql,
                params![
                    event.id.to_string(),
                    event.record_identifier,
                    event.batch_id,
                    event.field.as_str(),
                    event.old_value,
                    event.new_value,
                    event.detected_at.to_rfc3339(),
                ],
            );
            if let Err(e) = inserted {
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(e.into());
            }
        }
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn changes_for_record(&self, identifier: &str) -> Result<Vec<ChangeEvent>> {
        self.query_events("record_identifier", identifier, "detected_at, field")
    }

    fn changes_for_batch(&self, batch_id: &str) -> Result<Vec<ChangeEvent>> {
        self.query_events("batch_id", batch_id, "record_identifier, field")
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkTally, FieldDiff};
    use tempfile::TempDir;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    #[test]
    fn test_record_round_trip_with_provenance() {
        let repo = repo();
        let record = Record::new("P1")
            .with(CanonicalField::Status, "Home Sign Ups: Approved")
            .with(CanonicalField::Address, "1 Main St, Lawley")
            .stamped("week1.csv", "B1", Utc::now());

        repo.upsert(&record).unwrap();
        let stored = repo.get("P1").unwrap().unwrap();

        assert_eq!(stored.content(), record.content());
        let provenance = stored.provenance.unwrap();
        assert_eq!(provenance.import_batch_id, "B1");
        assert!(repo.get("P2").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let repo = repo();
        repo.upsert(&Record::new("P1").with(CanonicalField::Status, "A")).unwrap();
        repo.upsert(&Record::new("P1").with(CanonicalField::Status, "B")).unwrap();

        assert_eq!(repo.count_all().unwrap(), 1);
        assert_eq!(repo.get("P1").unwrap().unwrap().status, "B");
        assert_eq!(repo.identifiers().unwrap(), vec!["P1".to_string()]);
    }

    #[test]
    fn test_upsert_chunk() {
        let repo = repo();
        let chunk: Vec<Record> = (1..=3).map(|i| Record::new(format!("P{}", i))).collect();
        repo.upsert_chunk(&chunk).unwrap();
        assert_eq!(repo.count_all().unwrap(), 3);

        // The connection is usable again after the chunk transaction
        repo.upsert(&Record::new("P4")).unwrap();
        assert_eq!(repo.count_all().unwrap(), 4);
    }

    #[test]
    fn test_failed_chunk_rolls_back() {
        let repo = repo();
        {
            // Same columns, but one identifier is refused by a constraint
            let conn = repo.conn().unwrap();
            conn.execute_batch(
                "DROP TABLE sys_records;
                 CREATE TABLE sys_records (
                     identifier VARCHAR PRIMARY KEY CHECK (identifier <> 'P-BAD'),
                     secondary_external_id VARCHAR NOT NULL DEFAULT '',
                     structure_number VARCHAR NOT NULL DEFAULT '',
                     drop_number VARCHAR NOT NULL DEFAULT '',
                     status VARCHAR NOT NULL DEFAULT '',
                     flow_groups VARCHAR NOT NULL DEFAULT '',
                     section_list VARCHAR NOT NULL DEFAULT '',
                     pon_group VARCHAR NOT NULL DEFAULT '',
                     location_summary VARCHAR NOT NULL DEFAULT '',
                     address VARCHAR NOT NULL DEFAULT '',
                     field_agent_name VARCHAR NOT NULL DEFAULT '',
                     last_modified_by VARCHAR NOT NULL DEFAULT '',
                     last_modified_date VARCHAR NOT NULL DEFAULT '',
                     source_file VARCHAR,
                     import_batch_id VARCHAR,
                     last_updated VARCHAR
                 );",
            )
            .unwrap();
        }

        let chunk = vec![Record::new("P1"), Record::new("P-BAD"), Record::new("P3")];
        assert!(repo.upsert_chunk(&chunk).is_err());
        assert_eq!(repo.count_all().unwrap(), 0);
        assert!(repo.get("P1").unwrap().is_none());

        // The rollback leaves the connection usable
        repo.upsert(&Record::new("P2")).unwrap();
        assert_eq!(repo.count_all().unwrap(), 1);
    }

    #[test]
    fn test_batch_ledger_round_trip() {
        let repo = repo();
        let mut batch = ImportBatch::new("LAWLEY_20250522_WEEKLY", "Lawley May 22.csv");
        batch.snapshot_date = NaiveDate::from_ymd_opt(2025, 5, 22);
        batch.source_hash = Some("abc".to_string());
        repo.create_batch(&batch).unwrap();

        assert!(matches!(
            repo.create_batch(&batch),
            Err(Error::BatchIdCollision(_))
        ));

        batch.store_count_before = Some(7);
        batch.start(2, 1).unwrap();
        batch
            .record_chunk(ChunkTally {
                new: 1,
                errors: vec![RecordError {
                    identifier: "P2".to_string(),
                    message: "timeout".to_string(),
                }],
                ..Default::default()
            })
            .unwrap();
        batch.finish().unwrap();
        repo.update_batch(&batch).unwrap();

        let stored = repo.get_batch(&batch.id).unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Completed);
        assert_eq!(stored.counters, batch.counters);
        assert_eq!(stored.errors, batch.errors);
        assert_eq!(stored.snapshot_date, batch.snapshot_date);
        assert_eq!(stored.store_count_before, Some(7));
        assert!(stored.completed_at.is_some());

        assert_eq!(repo.list_batches().unwrap().len(), 1);
        assert!(repo.get_batch("missing").unwrap().is_none());
        assert_eq!(
            repo.count_batches_by_status().unwrap(),
            vec![("completed".to_string(), 1)]
        );
    }

    #[test]
    fn test_update_unknown_batch() {
        let repo = repo();
        let err = repo.update_batch(&ImportBatch::new("nope", "a.csv")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_change_history_queries() {
        let repo = repo();
        let diff = |field, old: &str, new: &str| FieldDiff {
            field,
            old_value: old.to_string(),
            new_value: new.to_string(),
        };
        let now = Utc::now();
        repo.append_changes(&[
            ChangeEvent::from_diff("P1", "B1", &diff(CanonicalField::Status, "A", "B"), now),
            ChangeEvent::from_diff("P1", "B1", &diff(CanonicalField::DropNumber, "", "DR1"), now),
            ChangeEvent::from_diff("P2", "B2", &diff(CanonicalField::Status, "A", "C"), now),
        ])
        .unwrap();

        let p1 = repo.changes_for_record("P1").unwrap();
        assert_eq!(p1.len(), 2);
        assert!(p1.iter().all(|e| e.batch_id == "B1"));

        let b2 = repo.changes_for_batch("B2").unwrap();
        assert_eq!(b2.len(), 1);
        assert_eq!(b2[0].new_value, "C");
        assert_eq!(repo.count_change_events().unwrap(), 3);
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(is_retryable_error(
            "The process cannot access the file because it is being used by another process"
        ));
        assert!(is_retryable_error("IO Error: Could not set lock on file \"x.duckdb\""));
        assert!(is_retryable_error("database is locked"));
        assert!(!is_retryable_error("Permission denied"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fieldline.duckdb");
        {
            let repo = DuckDbRepository::new(&path).unwrap();
            repo.ensure_schema().unwrap();
            repo.upsert(&Record::new("P1")).unwrap();
        }

        let repo = DuckDbRepository::new(&path).unwrap();
        let result = repo.run_migrations().unwrap();
        assert!(result.applied.is_empty());
        assert_eq!(repo.count_all().unwrap(), 1);
        assert!(repo.get_db_size().unwrap() > 0);
    }
}
