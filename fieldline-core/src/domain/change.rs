//! Change history domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::CanonicalField;

/// A single tracked-field difference between the stored and incoming record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub field: CanonicalField,
    pub old_value: String,
    pub new_value: String,
}

/// Immutable audit entry for one field diff detected by one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub id: Uuid,
    pub record_identifier: String,
    pub batch_id: String,
    pub field: CanonicalField,
    pub old_value: String,
    pub new_value: String,
    pub detected_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn from_diff(
        record_identifier: &str,
        batch_id: &str,
        diff: &FieldDiff,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_identifier: record_identifier.to_string(),
            batch_id: batch_id.to_string(),
            field: diff.field,
            old_value: diff.old_value.clone(),
            new_value: diff.new_value.clone(),
            detected_at,
        }
    }
}
