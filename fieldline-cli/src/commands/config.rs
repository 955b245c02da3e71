//! Config command - show or change settings.json

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use fieldline_core::config::Config;

use super::get_data_dir;
use crate::output;

/// Settings given on the command line
pub struct Changes {
    pub project: Option<String>,
    pub chunk_size: Option<usize>,
    pub workers: Option<usize>,
    pub default_year: Option<i32>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.project.is_none()
            && self.chunk_size.is_none()
            && self.workers.is_none()
            && self.default_year.is_none()
    }

    fn apply(self, config: &mut Config) {
        if let Some(project) = self.project {
            config.project = Some(project);
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(year) = self.default_year {
            config.default_year = year;
        }
    }
}

pub fn run(changes: Changes, json: bool) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut config = Config::load(&data_dir).context("Failed to load settings")?;

    let changed = !changes.is_empty();
    if changed {
        changes.apply(&mut config);
        config.validate()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
        config.save(&data_dir).context("Failed to save settings")?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "project": config.project,
                "chunkSize": config.chunk_size,
                "workers": config.workers,
                "defaultYear": config.default_year,
                "headerMappings": config.header_mappings,
            }))?
        );
        return Ok(());
    }

    println!("{}", "Settings".bold());
    let mut table = output::create_table();
    table.add_row(vec!["Project", config.project.as_deref().unwrap_or("(none)")]);
    table.add_row(vec!["Chunk size", &config.chunk_size.to_string()]);
    table.add_row(vec!["Workers", &config.workers.to_string()]);
    table.add_row(vec!["Default year", &config.default_year.to_string()]);
    println!("{}", table);

    let mut headers = output::create_table();
    headers.set_header(vec!["Field", "Header contains"]);
    for (field, keys) in config.header_mappings.iter() {
        headers.add_row(vec![field.to_string(), keys.join(" | ")]);
    }
    println!("{}", headers);

    if changed {
        output::success(&format!("Saved {}", data_dir.join("settings.json").display()));
    }
    Ok(())
}
