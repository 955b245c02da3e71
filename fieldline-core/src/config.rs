//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "project": "LAWLEY",
//!   "import": {
//!     "chunkSize": 490,
//!     "workers": 4,
//!     "headerMappings": { "identifier": ["Property ID"], "status": ["Status"] }
//!   }
//! }
//! ```
//! Keys this crate does not manage are preserved when saving.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::CanonicalField;
use crate::ports::DEFAULT_MAX_CHUNK_SIZE;

const DEFAULT_WORKERS: usize = 4;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    import: ImportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default)]
    chunk_size: Option<usize>,
    #[serde(default)]
    workers: Option<usize>,
    #[serde(default)]
    default_year: Option<i32>,
    #[serde(default)]
    header_mappings: BTreeMap<CanonicalField, Vec<String>>,
}

/// Header dictionary: canonical field → header substrings that bind to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderMappings(BTreeMap<CanonicalField, Vec<String>>);

impl HeaderMappings {
    /// Header keys configured for a field
    pub fn keys(&self, field: CanonicalField) -> &[String] {
        self.0.get(&field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalField, &Vec<String>)> {
        self.0.iter()
    }

    /// Overlay configured keys on top of these, field by field
    fn overlay(mut self, overrides: &BTreeMap<CanonicalField, Vec<String>>) -> Self {
        for (field, keys) in overrides {
            self.0.insert(*field, keys.clone());
        }
        self
    }
}

impl Default for HeaderMappings {
    /// Column headers of the OneMap field-survey export
    fn default() -> Self {
        let pairs: [(CanonicalField, &str); 13] = [
            (CanonicalField::Identifier, "Property ID"),
            (CanonicalField::SecondaryExternalId, "1map NAD ID"),
            (CanonicalField::StructureNumber, "Pole Number"),
            (CanonicalField::DropNumber, "Drop Number"),
            (CanonicalField::Status, "Status"),
            (CanonicalField::FlowGroups, "Flow Name Groups"),
            (CanonicalField::SectionList, "Sections"),
            (CanonicalField::PonGroup, "PONs"),
            (CanonicalField::LocationSummary, "Location"),
            (CanonicalField::Address, "Address"),
            (CanonicalField::FieldAgentName, "Field Agent Name (Home Sign Ups)"),
            (CanonicalField::LastModifiedBy, "Last Modified Home Sign Ups By"),
            (CanonicalField::LastModifiedDate, "Last Modified Home Sign Ups Date"),
        ];
        Self(
            pairs
                .into_iter()
                .map(|(field, key)| (field, vec![key.to_string()]))
                .collect(),
        )
    }
}

/// Fieldline configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: Option<String>,
    /// Records per write chunk (capped by the store's own limit)
    pub chunk_size: usize,
    /// Worker threads used for lookup + classification
    pub workers: usize,
    /// Year assumed for filenames like "May 22"
    pub default_year: i32,
    pub header_mappings: HeaderMappings,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: None,
            chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            default_year: chrono::Utc::now().year(),
            header_mappings: HeaderMappings::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", name, value))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Worker count and chunk size can be overridden with the
    /// `FIELDLINE_WORKERS` and `FIELDLINE_CHUNK_SIZE` environment variables.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", settings_path.display(), e)))?
        } else {
            SettingsFile::default()
        };

        let defaults = Config::default();
        let chunk_size = env_usize("FIELDLINE_CHUNK_SIZE")?
            .or(raw.import.chunk_size)
            .unwrap_or(defaults.chunk_size);
        let workers = env_usize("FIELDLINE_WORKERS")?
            .or(raw.import.workers)
            .unwrap_or(defaults.workers);

        let config = Self {
            project: raw.project.clone(),
            chunk_size,
            workers,
            default_year: raw.import.default_year.unwrap_or(defaults.default_year),
            header_mappings: HeaderMappings::default().overlay(&raw.import.header_mappings),
            _raw_settings: raw,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the importer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunkSize must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.header_mappings.keys(CanonicalField::Identifier).is_empty() {
            return Err(Error::Config(
                "headerMappings.identifier needs at least one header".to_string(),
            ));
        }
        Ok(())
    }

    /// Save config to the data directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = self._raw_settings.clone();
        settings.project = self.project.clone();
        settings.import.chunk_size = Some(self.chunk_size);
        settings.import.workers = Some(self.workers);
        settings.import.default_year = Some(self.default_year);
        settings.import.header_mappings = self
            .header_mappings
            .iter()
            .map(|(field, keys)| (*field, keys.clone()))
            .collect();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(
            config.header_mappings.keys(CanonicalField::Identifier),
            ["Property ID".to_string()]
        );
        assert!(config.project.is_none());
    }

    #[test]
    fn test_partial_header_mappings_overlay_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"project":"LAWLEY","import":{"chunkSize":100,"headerMappings":{"identifier":["Property ID","Prop ID"]}},"theme":"dark"}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.project.as_deref(), Some("LAWLEY"));
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.header_mappings.keys(CanonicalField::Identifier).len(), 2);
        assert_eq!(
            config.header_mappings.keys(CanonicalField::DropNumber),
            ["Drop Number".to_string()]
        );

        // Unmanaged keys survive a save
        config.save(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(content.contains("\"theme\""));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"import":{"chunkSize":0}}"#,
        )
        .unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_settings_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::Config(_))));
    }
}
