//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod ledger;
mod record_store;

pub use ledger::{BatchLedger, ChangeHistory};
pub use record_store::{RecordStore, DEFAULT_MAX_CHUNK_SIZE};
