//! Survey record domain model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical fields a CSV column can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Identifier,
    SecondaryExternalId,
    StructureNumber,
    DropNumber,
    Status,
    FlowGroups,
    SectionList,
    PonGroup,
    LocationSummary,
    Address,
    FieldAgentName,
    LastModifiedBy,
    LastModifiedDate,
}

impl CanonicalField {
    /// All canonical fields, in export column order
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::Identifier,
        CanonicalField::SecondaryExternalId,
        CanonicalField::StructureNumber,
        CanonicalField::DropNumber,
        CanonicalField::Status,
        CanonicalField::FlowGroups,
        CanonicalField::SectionList,
        CanonicalField::PonGroup,
        CanonicalField::LocationSummary,
        CanonicalField::Address,
        CanonicalField::FieldAgentName,
        CanonicalField::LastModifiedBy,
        CanonicalField::LastModifiedDate,
    ];

    /// Fields compared by change detection.
    ///
    /// Provenance metadata is never part of this list, otherwise every
    /// re-import of an unchanged snapshot would look like a change.
    pub const TRACKED: [CanonicalField; 8] = [
        CanonicalField::StructureNumber,
        CanonicalField::DropNumber,
        CanonicalField::Status,
        CanonicalField::FieldAgentName,
        CanonicalField::LastModifiedBy,
        CanonicalField::LastModifiedDate,
        CanonicalField::LocationSummary,
        CanonicalField::Address,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Identifier => "identifier",
            CanonicalField::SecondaryExternalId => "secondaryExternalId",
            CanonicalField::StructureNumber => "structureNumber",
            CanonicalField::DropNumber => "dropNumber",
            CanonicalField::Status => "status",
            CanonicalField::FlowGroups => "flowGroups",
            CanonicalField::SectionList => "sectionList",
            CanonicalField::PonGroup => "ponGroup",
            CanonicalField::LocationSummary => "locationSummary",
            CanonicalField::Address => "address",
            CanonicalField::FieldAgentName => "fieldAgentName",
            CanonicalField::LastModifiedBy => "lastModifiedBy",
            CanonicalField::LastModifiedDate => "lastModifiedDate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the stored version of a record came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_file: String,
    pub import_batch_id: String,
    pub last_updated: DateTime<Utc>,
}

/// One field-survey subject (premises, pole or drop) as seen in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub identifier: String,
    #[serde(default)]
    pub secondary_external_id: String,
    #[serde(default)]
    pub structure_number: String,
    #[serde(default)]
    pub drop_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flow_groups: String,
    #[serde(default)]
    pub section_list: String,
    #[serde(default)]
    pub pon_group: String,
    #[serde(default)]
    pub location_summary: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub field_agent_name: String,
    #[serde(default)]
    pub last_modified_by: String,
    #[serde(default)]
    pub last_modified_date: String,

    /// Set when the record is written by an import batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl Record {
    /// Create a record with only its identifier set
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter, mostly useful in tests and fixtures
    pub fn with(mut self, field: CanonicalField, value: impl Into<String>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn get(&self, field: CanonicalField) -> &str {
        match field {
            CanonicalField::Identifier => &self.identifier,
            CanonicalField::SecondaryExternalId => &self.secondary_external_id,
            CanonicalField::StructureNumber => &self.structure_number,
            CanonicalField::DropNumber => &self.drop_number,
            CanonicalField::Status => &self.status,
            CanonicalField::FlowGroups => &self.flow_groups,
            CanonicalField::SectionList => &self.section_list,
            CanonicalField::PonGroup => &self.pon_group,
            CanonicalField::LocationSummary => &self.location_summary,
            CanonicalField::Address => &self.address,
            CanonicalField::FieldAgentName => &self.field_agent_name,
            CanonicalField::LastModifiedBy => &self.last_modified_by,
            CanonicalField::LastModifiedDate => &self.last_modified_date,
        }
    }

    pub fn set(&mut self, field: CanonicalField, value: String) {
        let slot = match field {
            CanonicalField::Identifier => &mut self.identifier,
            CanonicalField::SecondaryExternalId => &mut self.secondary_external_id,
            CanonicalField::StructureNumber => &mut self.structure_number,
            CanonicalField::DropNumber => &mut self.drop_number,
            CanonicalField::Status => &mut self.status,
            CanonicalField::FlowGroups => &mut self.flow_groups,
            CanonicalField::SectionList => &mut self.section_list,
            CanonicalField::PonGroup => &mut self.pon_group,
            CanonicalField::LocationSummary => &mut self.location_summary,
            CanonicalField::Address => &mut self.address,
            CanonicalField::FieldAgentName => &mut self.field_agent_name,
            CanonicalField::LastModifiedBy => &mut self.last_modified_by,
            CanonicalField::LastModifiedDate => &mut self.last_modified_date,
        };
        *slot = value;
    }

    /// Copy of this record stamped with the batch that is writing it
    pub fn stamped(&self, source_file: &str, batch_id: &str, at: DateTime<Utc>) -> Self {
        let mut stamped = self.clone();
        stamped.provenance = Some(Provenance {
            source_file: source_file.to_string(),
            import_batch_id: batch_id.to_string(),
            last_updated: at,
        });
        stamped
    }

    /// Copy of this record without provenance (for content comparisons)
    pub fn content(&self) -> Self {
        Self {
            provenance: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::parse(field.as_str()), Some(field));
        }
        assert_eq!(CanonicalField::parse("propertyId"), None);
    }

    #[test]
    fn test_tracked_excludes_identifier_and_untracked() {
        let tracked = CanonicalField::TRACKED;
        assert!(!tracked.contains(&CanonicalField::Identifier));
        assert!(!tracked.contains(&CanonicalField::PonGroup));
        assert!(tracked.contains(&CanonicalField::Status));
        assert!(tracked.contains(&CanonicalField::Address));
    }

    #[test]
    fn test_get_set() {
        let mut record = Record::new("P1");
        record.set(CanonicalField::Status, "Pole Permission: Approved".to_string());
        assert_eq!(record.get(CanonicalField::Status), "Pole Permission: Approved");
        assert_eq!(record.get(CanonicalField::DropNumber), "");
    }

    #[test]
    fn test_deserialize_missing_fields_default_empty() {
        let record: Record = serde_json::from_str(r#"{"identifier":"P9","status":"A"}"#).unwrap();
        assert_eq!(record.identifier, "P9");
        assert_eq!(record.status, "A");
        assert_eq!(record.structure_number, "");
        assert!(record.provenance.is_none());
    }

    #[test]
    fn test_stamped_keeps_content() {
        let record = Record::new("P1").with(CanonicalField::Status, "A");
        let stamped = record.stamped("week3.csv", "B1", Utc::now());
        assert_eq!(stamped.content(), record);
        assert_eq!(stamped.provenance.unwrap().import_batch_id, "B1");
    }
}
