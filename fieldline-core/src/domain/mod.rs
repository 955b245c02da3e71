//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod batch;
mod change;
mod record;
pub mod result;

pub use batch::{
    compose_batch_id, snapshot_date_from_filename, BatchCounters, BatchStatus, ChunkTally,
    ImportBatch, RecordError,
};
pub use change::{ChangeEvent, FieldDiff};
pub use record::{CanonicalField, Provenance, Record};
