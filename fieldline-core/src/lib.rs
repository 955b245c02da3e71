//! Fieldline Core - ingestion engine for field-survey snapshot exports
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Record, ImportBatch, ChangeEvent)
//! - **ports**: Trait definitions for storage (RecordStore, BatchLedger, ChangeHistory)
//! - **services**: Parsing, change detection, import coordination, reports
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    compose_batch_id, BatchCounters, BatchStatus, CanonicalField, ChangeEvent, ImportBatch,
    Record, RecordError,
};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "fieldline.duckdb";

/// Main context for Fieldline operations
///
/// Holds the configuration, the database and the services built on it.
/// Coordinators created from one context share its identifier locks, so
/// concurrent batches never interleave writes to the same record.
pub struct FieldlineContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub locks: Arc<IdentifierLocks>,
    pub report_service: ReportService,
    pub history_service: HistoryService,
    pub status_service: StatusService,
}

impl FieldlineContext {
    /// Open the data directory, creating the database schema if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir).context("Failed to load settings")?;

        let db_path = data_dir.join(DB_FILENAME);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );
        repository.ensure_schema().context("Failed to migrate database")?;

        let report_service = ReportService::new(
            repository.clone(),
            repository.clone(),
            repository.clone(),
        );
        let history_service = HistoryService::new(repository.clone());
        let status_service = StatusService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            repository,
            locks: Arc::new(IdentifierLocks::new()),
            report_service,
            history_service,
            status_service,
        })
    }

    /// A coordinator for one batch, wired to this context's store and locks
    pub fn import_coordinator(&self) -> ImportCoordinator {
        ImportCoordinator::new(
            self.repository.clone(),
            self.repository.clone(),
            self.repository.clone(),
            Arc::clone(&self.locks),
            CsvParser::new(self.config.header_mappings.clone()),
            ImportOptions::from_config(&self.config),
        )
    }
}
