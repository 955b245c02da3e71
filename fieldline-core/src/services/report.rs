//! Pre- and post-import reports

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{BatchStatus, CanonicalField, RecordError};
use crate::ports::{BatchLedger, ChangeHistory, RecordStore};
use crate::services::parser::ParsedCsv;

/// How many valid rows carry a value for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPopulation {
    pub field: CanonicalField,
    pub populated: u64,
    /// `populated / validRows`, 0 when there are no valid rows
    pub rate: f64,
}

/// Data-quality summary of a parsed source, before anything is written
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreImportReport {
    pub source_file: String,
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_rows: u64,
    pub invalid_lines: Vec<usize>,
    /// Valid rows whose identifier already appeared earlier in the file
    pub duplicates_within_csv: u64,
    pub duplicate_identifiers: Vec<String>,
    pub field_population: Vec<FieldPopulation>,
    pub status_counts: BTreeMap<String, u64>,
    /// Fields no header column bound to
    pub unbound_fields: Vec<CanonicalField>,
}

impl PreImportReport {
    pub fn from_parsed(source_file: &str, parsed: &ParsedCsv) -> Self {
        let valid_rows = parsed.records.len() as u64;

        let mut seen: HashMap<&str, u64> = HashMap::new();
        let mut duplicate_identifiers = Vec::new();
        for record in &parsed.records {
            let count = seen.entry(record.identifier.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicate_identifiers.push(record.identifier.clone());
            }
        }
        let duplicates_within_csv = valid_rows - seen.len() as u64;

        let field_population = CanonicalField::ALL
            .into_iter()
            .map(|field| {
                let populated = parsed
                    .records
                    .iter()
                    .filter(|r| !r.get(field).is_empty())
                    .count() as u64;
                let rate = if valid_rows == 0 {
                    0.0
                } else {
                    populated as f64 / valid_rows as f64
                };
                FieldPopulation { field, populated, rate }
            })
            .collect();

        let mut status_counts = BTreeMap::new();
        for record in &parsed.records {
            *status_counts.entry(record.status.clone()).or_insert(0) += 1;
        }

        Self {
            source_file: source_file.to_string(),
            total_rows: parsed.total_rows() as u64,
            valid_rows,
            invalid_rows: parsed.invalid_lines.len() as u64,
            invalid_lines: parsed.invalid_lines.clone(),
            duplicates_within_csv,
            duplicate_identifiers,
            field_population,
            status_counts,
            unbound_fields: parsed.binding.unbound(),
        }
    }
}

/// Outcome of a finished batch, reconciled with the store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostImportReport {
    pub batch_id: String,
    pub source_file: String,
    pub status: BatchStatus,
    pub failure_reason: Option<String>,
    /// Records in the store when the batch began
    pub previous_total: u64,
    pub records_added: u64,
    pub records_updated: u64,
    pub records_unchanged: u64,
    pub records_errored: u64,
    pub superseded: u64,
    /// `previousTotal + recordsAdded`
    pub current_total: u64,
    /// Live record count when the report was generated
    pub store_total_now: u64,
    /// Identifiers stored more than once (always empty for a keyed store)
    pub duplicate_identifiers: Vec<String>,
    pub errors: Vec<RecordError>,
    /// `"old → new"` status changes detected by the batch
    pub status_transitions: BTreeMap<String, u64>,
    /// Time from batch creation to its terminal state
    pub duration_ms: Option<i64>,
    /// Processed records per second over `durationMs`
    pub records_per_second: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

fn status_label(value: &str) -> &str {
    if value.is_empty() {
        "(blank)"
    } else {
        value
    }
}

/// Builds reports from the storage ports; never writes
pub struct ReportService {
    store: Arc<dyn RecordStore>,
    ledger: Arc<dyn BatchLedger>,
    history: Arc<dyn ChangeHistory>,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        ledger: Arc<dyn BatchLedger>,
        history: Arc<dyn ChangeHistory>,
    ) -> Self {
        Self {
            store,
            ledger,
            history,
        }
    }

    /// Report on a batch that reached `completed` or `failed`
    pub fn post_import(&self, batch_id: &str) -> Result<PostImportReport> {
        let batch = self
            .ledger
            .get_batch(batch_id)?
            .ok_or_else(|| Error::not_found(format!("import batch {}", batch_id)))?;
        if !batch.status.is_terminal() {
            return Err(Error::validation(format!(
                "batch {} is still {}",
                batch.id, batch.status
            )));
        }

        let store_total_now = self.store.count_all()?;

        let mut occurrences: HashMap<String, u64> = HashMap::new();
        for identifier in self.store.identifiers()? {
            *occurrences.entry(identifier).or_insert(0) += 1;
        }
        let mut duplicate_identifiers: Vec<String> = occurrences
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(id, _)| id)
            .collect();
        duplicate_identifiers.sort();

        let mut status_transitions = BTreeMap::new();
        for event in self.history.changes_for_batch(batch_id)? {
            if event.field == CanonicalField::Status {
                let key = format!(
                    "{} → {}",
                    status_label(&event.old_value),
                    status_label(&event.new_value)
                );
                *status_transitions.entry(key).or_insert(0) += 1;
            }
        }

        let counters = batch.counters;
        // Batches written before the count was kept fall back to the live total
        let previous_total = batch
            .store_count_before
            .unwrap_or_else(|| store_total_now.saturating_sub(counters.new));
        let duration_ms = batch
            .completed_at
            .map(|done| (done - batch.created_at).num_milliseconds());
        let records_per_second = duration_ms
            .filter(|ms| *ms > 0)
            .map(|ms| counters.processed() as f64 * 1000.0 / ms as f64);

        Ok(PostImportReport {
            batch_id: batch.id,
            source_file: batch.source_file,
            status: batch.status,
            failure_reason: batch.failure_reason,
            previous_total,
            records_added: counters.new,
            records_updated: counters.changed,
            records_unchanged: counters.unchanged,
            records_errored: counters.error,
            superseded: counters.superseded,
            current_total: previous_total + counters.new,
            store_total_now,
            duplicate_identifiers,
            errors: batch.errors,
            status_transitions,
            duration_ms,
            records_per_second,
            generated_at: Utc::now(),
        })
    }
}
