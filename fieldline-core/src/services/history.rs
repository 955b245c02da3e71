//! Change history queries and CSV export

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::ChangeEvent;
use crate::ports::ChangeHistory;

/// Flat row written by the CSV export
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    detected_at: String,
    batch_id: &'a str,
    record_identifier: &'a str,
    field: &'static str,
    old_value: &'a str,
    new_value: &'a str,
}

impl<'a> From<&'a ChangeEvent> for ExportRow<'a> {
    fn from(event: &'a ChangeEvent) -> Self {
        Self {
            detected_at: event.detected_at.to_rfc3339(),
            batch_id: &event.batch_id,
            record_identifier: &event.record_identifier,
            field: event.field.as_str(),
            old_value: &event.old_value,
            new_value: &event.new_value,
        }
    }
}

pub struct HistoryService {
    history: Arc<dyn ChangeHistory>,
}

impl HistoryService {
    pub fn new(history: Arc<dyn ChangeHistory>) -> Self {
        Self { history }
    }

    /// Every change recorded for one record, oldest first
    pub fn for_record(&self, identifier: &str) -> Result<Vec<ChangeEvent>> {
        let mut events = self.history.changes_for_record(identifier)?;
        events.sort_by_key(|e| e.detected_at);
        Ok(events)
    }

    /// Changes detected by one batch, grouped by record
    pub fn for_batch(&self, batch_id: &str) -> Result<Vec<ChangeEvent>> {
        let mut events = self.history.changes_for_batch(batch_id)?;
        events.sort_by(|a, b| {
            a.record_identifier
                .cmp(&b.record_identifier)
                .then(a.field.cmp(&b.field))
        });
        Ok(events)
    }

    /// Write a batch's changes as CSV, returning the number of rows written
    pub fn export_batch<W: Write>(&self, batch_id: &str, out: W) -> Result<usize> {
        let events = self.for_batch(batch_id)?;
        let mut writer = csv::Writer::from_writer(out);
        for event in &events {
            writer.serialize(ExportRow::from(event))?;
        }
        writer.flush()?;
        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::{CanonicalField, FieldDiff};
    use chrono::{Duration, Utc};

    fn event(id: &str, batch: &str, field: CanonicalField, old: &str, new: &str) -> ChangeEvent {
        let diff = FieldDiff {
            field,
            old_value: old.to_string(),
            new_value: new.to_string(),
        };
        ChangeEvent::from_diff(id, batch, &diff, Utc::now())
    }

    #[test]
    fn test_record_history_oldest_first() {
        let store = Arc::new(MemoryStore::new());
        let mut later = event("P1", "B2", CanonicalField::Status, "A", "B");
        later.detected_at = Utc::now() + Duration::hours(1);
        let earlier = event("P1", "B1", CanonicalField::Status, "", "A");
        store.append_changes(&[later, earlier]).unwrap();

        let service = HistoryService::new(store);
        let history = service.for_record("P1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].batch_id, "B1");
        assert!(service.for_record("P9").unwrap().is_empty());
    }

    #[test]
    fn test_export_batch_csv() {
        let store = Arc::new(MemoryStore::new());
        store
            .append_changes(&[
                event("P2", "B1", CanonicalField::Status, "A", "B, final"),
                event("P1", "B1", CanonicalField::DropNumber, "", "DR1"),
                event("P1", "B2", CanonicalField::Status, "B", "C"),
            ])
            .unwrap();

        let service = HistoryService::new(store);
        let mut out = Vec::new();
        let rows = service.export_batch("B1", &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "detected_at,batch_id,record_identifier,field,old_value,new_value"
        );
        assert!(lines[1].contains(",B1,P1,dropNumber,,DR1"));
        assert!(lines[2].ends_with(",B1,P2,status,A,\"B, final\""));
    }
}
