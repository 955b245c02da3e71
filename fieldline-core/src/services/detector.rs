//! Change detector - classify an incoming record against the stored one

use serde::Serialize;

use crate::domain::{CanonicalField, FieldDiff, Record};

/// How an incoming record relates to the stored version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    New,
    Changed,
    Unchanged,
}

/// Result of classifying one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: ChangeKind,
    pub diffs: Vec<FieldDiff>,
}

/// Classify `incoming` against `existing`.
///
/// Only tracked fields are compared, using exact string equality. There is
/// no trimming or case folding: a whitespace-only edit is a change. Stored
/// records deserialized without a field compare as the empty string.
pub fn classify(incoming: &Record, existing: Option<&Record>) -> Classification {
    let Some(existing) = existing else {
        return Classification {
            kind: ChangeKind::New,
            diffs: Vec::new(),
        };
    };

    let diffs = diff_tracked(existing, incoming);
    let kind = if diffs.is_empty() {
        ChangeKind::Unchanged
    } else {
        ChangeKind::Changed
    };
    Classification { kind, diffs }
}

/// Tracked-field differences from `old` to `new`, in allow-list order
pub fn diff_tracked(old: &Record, new: &Record) -> Vec<FieldDiff> {
    CanonicalField::TRACKED
        .iter()
        .filter_map(|&field| {
            let (old_value, new_value) = (old.get(field), new.get(field));
            (old_value != new_value).then(|| FieldDiff {
                field,
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, status: &str) -> Record {
        Record::new(id).with(CanonicalField::Status, status)
    }

    #[test]
    fn test_absent_is_new() {
        let c = classify(&record("P1", "A"), None);
        assert_eq!(c.kind, ChangeKind::New);
        assert!(c.diffs.is_empty());
    }

    #[test]
    fn test_identical_is_unchanged() {
        let c = classify(&record("P1", "A"), Some(&record("P1", "A")));
        assert_eq!(c.kind, ChangeKind::Unchanged);
    }

    #[test]
    fn test_status_change() {
        let c = classify(&record("P1", "C"), Some(&record("P1", "A")));
        assert_eq!(c.kind, ChangeKind::Changed);
        assert_eq!(
            c.diffs,
            vec![FieldDiff {
                field: CanonicalField::Status,
                old_value: "A".to_string(),
                new_value: "C".to_string(),
            }]
        );
    }

    #[test]
    fn test_whitespace_and_case_are_changes() {
        let c = classify(&record("P1", "a"), Some(&record("P1", "A")));
        assert_eq!(c.kind, ChangeKind::Changed);
        let c = classify(&record("P1", "A "), Some(&record("P1", "A")));
        assert_eq!(c.kind, ChangeKind::Changed);
    }

    #[test]
    fn test_untracked_fields_and_provenance_ignored() {
        let stored = record("P1", "A")
            .with(CanonicalField::PonGroup, "PON 1")
            .stamped("old.csv", "B0", Utc::now());
        let incoming = record("P1", "A").with(CanonicalField::PonGroup, "PON 2");
        assert_eq!(classify(&incoming, Some(&stored)).kind, ChangeKind::Unchanged);
    }

    #[test]
    fn test_missing_stored_field_treated_as_empty() {
        let stored: Record = serde_json::from_str(r#"{"identifier":"P1","status":"A"}"#).unwrap();
        let incoming = record("P1", "A").with(CanonicalField::DropNumber, "DR9");
        let c = classify(&incoming, Some(&stored));
        assert_eq!(c.diffs.len(), 1);
        assert_eq!(c.diffs[0].field, CanonicalField::DropNumber);
        assert_eq!(c.diffs[0].old_value, "");
    }

    #[test]
    fn test_every_tracked_field_detected() {
        for field in CanonicalField::TRACKED {
            let incoming = Record::new("P1").with(field, "x");
            let c = classify(&incoming, Some(&Record::new("P1")));
            assert_eq!(c.diffs.len(), 1, "{} not detected", field);
            assert_eq!(c.diffs[0].field, field);
        }
    }

    #[test]
    fn test_order_independent() {
        let a = record("A", "1");
        let b = record("B", "2");
        let stored_a = record("A", "0");
        let first = (classify(&a, Some(&stored_a)), classify(&b, None));
        let second = (classify(&b, None), classify(&a, Some(&stored_a)));
        assert_eq!(first.0, second.1);
        assert_eq!(first.1, second.0);
    }
}
