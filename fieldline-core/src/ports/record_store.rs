//! Record store port - durable identifier → record map

use crate::domain::result::Result;
use crate::domain::Record;

/// Largest number of writes committed atomically when the backing store
/// does not say otherwise: a 500-operation limit minus a 10-operation margin.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 490;

/// Record store abstraction
///
/// The import coordinator only needs lookup by identifier, upsert by
/// identifier and a total count. Everything else about the backing
/// database (tables, documents, transport) stays behind this trait.
pub trait RecordStore: Send + Sync {
    /// Look up the stored version of a record
    fn get(&self, identifier: &str) -> Result<Option<Record>>;

    /// Insert or replace the record stored under `record.identifier`
    fn upsert(&self, record: &Record) -> Result<()>;

    /// Number of stored records
    fn count_all(&self) -> Result<u64>;

    /// All stored identifiers. Used for the post-import duplicate check.
    fn identifiers(&self) -> Result<Vec<String>>;

    /// Write several records as one atomic unit.
    ///
    /// Stores without multi-write atomicity keep the default, which writes
    /// record by record and stops at the first failure.
    fn upsert_chunk(&self, records: &[Record]) -> Result<()> {
        for record in records {
            self.upsert(record)?;
        }
        Ok(())
    }

    /// Atomic write size limit of the backing store
    fn max_chunk_size(&self) -> usize {
        DEFAULT_MAX_CHUNK_SIZE
    }
}
