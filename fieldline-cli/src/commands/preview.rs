//! Preview command - data-quality report without touching the database

use std::path::Path;

use anyhow::{Context, Result};

use fieldline_core::config::Config;
use fieldline_core::services::{CsvParser, PreImportReport};

use super::{get_data_dir, source_name};
use crate::output;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let config = Config::load(&get_data_dir()?).context("Failed to load settings")?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let parsed = CsvParser::new(config.header_mappings).parse(&text)?;
    let report = PreImportReport::from_parsed(&source_name(file), &parsed);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_pre_report(&report);
    }
    Ok(())
}
