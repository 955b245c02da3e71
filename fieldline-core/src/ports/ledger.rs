//! Batch ledger and change history ports

use crate::domain::result::Result;
use crate::domain::{ChangeEvent, ImportBatch};

/// Storage for import batch metadata
pub trait BatchLedger: Send + Sync {
    /// Persist a new batch.
    ///
    /// Returns `Error::BatchIdCollision` if a batch with the same id exists.
    fn create_batch(&self, batch: &ImportBatch) -> Result<()>;

    /// Get a batch by id
    fn get_batch(&self, batch_id: &str) -> Result<Option<ImportBatch>>;

    /// Overwrite the stored state of an existing batch
    fn update_batch(&self, batch: &ImportBatch) -> Result<()>;

    /// All batches, oldest first
    fn list_batches(&self) -> Result<Vec<ImportBatch>>;
}

/// Append-only log of field-level changes
pub trait ChangeHistory: Send + Sync {
    /// Append events. Order relative to concurrent appends is not guaranteed.
    fn append_changes(&self, events: &[ChangeEvent]) -> Result<()>;

    /// Events for one record, oldest first
    fn changes_for_record(&self, identifier: &str) -> Result<Vec<ChangeEvent>>;

    /// Events detected by one batch
    fn changes_for_batch(&self, batch_id: &str) -> Result<Vec<ChangeEvent>>;
}
