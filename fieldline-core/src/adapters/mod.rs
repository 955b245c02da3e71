//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the record store, batch ledger and change history
//! - An in-memory store used as a test double

pub mod duckdb;
pub mod memory;
