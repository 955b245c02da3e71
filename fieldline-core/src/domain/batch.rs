//! Import batch ledger entry and its state machine

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Lifecycle state of an import batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BatchStatus::Pending),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Pending, BatchStatus::Processing)
                | (BatchStatus::Pending, BatchStatus::Failed)
                | (BatchStatus::Processing, BatchStatus::Completed)
                | (BatchStatus::Processing, BatchStatus::Failed)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-batch classification counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCounters {
    /// Distinct valid identifiers in the source
    pub total: u64,
    pub new: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub error: u64,
    /// Rows replaced by a later row with the same identifier in the same file
    pub superseded: u64,
}

impl BatchCounters {
    /// Records that reached a classification other than ERROR
    pub fn successes(&self) -> u64 {
        self.new + self.changed + self.unchanged
    }

    /// Records classified so far (including errors)
    pub fn processed(&self) -> u64 {
        self.successes() + self.error
    }
}

/// A record that could not be written, kept on the batch for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    pub identifier: String,
    pub message: String,
}

/// Counts produced by one committed chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkTally {
    pub new: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub errors: Vec<RecordError>,
}

/// One execution of the ingestion pipeline against one CSV file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: String,
    pub source_file: String,
    /// SHA-256 of the source text, hex encoded
    pub source_hash: Option<String>,
    /// Date the snapshot was exported, when the filename carries one
    pub snapshot_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counters: BatchCounters,
    pub errors: Vec<RecordError>,
    pub failure_reason: Option<String>,
    /// Records in the store when the batch began
    pub store_count_before: Option<u64>,
}

impl ImportBatch {
    /// Create a pending batch
    pub fn new(id: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_file: source_file.into(),
            source_hash: None,
            snapshot_date: None,
            status: BatchStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            counters: BatchCounters::default(),
            errors: Vec::new(),
            failure_reason: None,
            store_count_before: None,
        }
    }

    fn transition(&mut self, next: BatchStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                batch_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Move to `processing` with the number of distinct records to classify
    pub fn start(&mut self, total: u64, superseded: u64) -> Result<()> {
        self.transition(BatchStatus::Processing)?;
        self.counters.total = total;
        self.counters.superseded = superseded;
        Ok(())
    }

    /// Add the outcome of one committed chunk. Only valid while processing.
    pub fn record_chunk(&mut self, tally: ChunkTally) -> Result<()> {
        if self.status != BatchStatus::Processing {
            return Err(Error::validation(format!(
                "batch {} is {}, counters are frozen",
                self.id, self.status
            )));
        }
        self.counters.new += tally.new;
        self.counters.changed += tally.changed;
        self.counters.unchanged += tally.unchanged;
        self.counters.error += tally.errors.len() as u64;
        self.errors.extend(tally.errors);
        Ok(())
    }

    /// Close a processing batch.
    ///
    /// A batch where every record errored is `failed`; any success makes it
    /// `completed`, even with errors.
    pub fn finish(&mut self) -> Result<()> {
        if self.counters.error > 0 && self.counters.successes() == 0 {
            return self.fail("every record failed to import");
        }
        self.transition(BatchStatus::Completed)
    }

    /// Fail the batch from `pending` or `processing`
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(BatchStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

/// Compose a batch id following the `<PROJECT>_<YYYYMMDD>_<PURPOSE>` convention
pub fn compose_batch_id(project: &str, date: NaiveDate, purpose: &str) -> String {
    let clean = |s: &str| {
        s.trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '-' })
            .collect::<String>()
    };
    format!("{}_{}_{}", clean(project), date.format("%Y%m%d"), clean(purpose))
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})\s*-\s*(\d{2})\s*-\s*(\d{2})").unwrap())
}

fn compact_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{2})-?(\d{2})-?(\d{4})(?:\D|$)").unwrap())
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{1,2})\b")
            .unwrap()
    })
}

/// Extract the snapshot date from an export filename.
///
/// Understands `2025-05-22`, `..._22052025.csv` (day, month, year) and
/// `May 22` (using `default_year`).
pub fn snapshot_date_from_filename(filename: &str, default_year: i32) -> Option<NaiveDate> {
    if let Some(caps) = iso_date_re().captures(filename) {
        let (y, m, d) = (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date);
        }
    }

    if let Some(caps) = compact_date_re().captures(filename) {
        let (d, m, y) = (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date);
        }
    }

    let caps = month_day_re().captures(filename)?;
    let month = match caps[1].to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        _ => 12,
    };
    NaiveDate::from_ymd_opt(default_year, month, caps[2].parse().ok()?)
}
