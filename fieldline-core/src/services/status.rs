//! Status service - store and ledger summary

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::ports::{BatchLedger, RecordStore};

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let total_records = self
            .repository
            .count_all()
            .context("Failed to count records")?;
        let batches_by_status: BTreeMap<String, u64> = self
            .repository
            .count_batches_by_status()
            .context("Failed to count batches")?
            .into_iter()
            .collect();
        let total_change_events = self.repository.count_change_events()?;
        let last_batch = self
            .repository
            .list_batches()?
            .into_iter()
            .last()
            .map(|b| LastBatch {
                id: b.id,
                source_file: b.source_file,
                status: b.status.to_string(),
                created_at: b.created_at.to_rfc3339(),
            });

        Ok(StatusSummary {
            total_records,
            total_batches: batches_by_status.values().sum(),
            batches_by_status,
            total_change_events,
            database_size: self.repository.get_db_size()?,
            last_batch,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_records: u64,
    pub total_batches: u64,
    pub batches_by_status: BTreeMap<String, u64>,
    pub total_change_events: u64,
    pub database_size: u64,
    pub last_batch: Option<LastBatch>,
}

#[derive(Debug, Serialize)]
pub struct LastBatch {
    pub id: String,
    pub source_file: String,
    pub status: String,
    pub created_at: String,
}
