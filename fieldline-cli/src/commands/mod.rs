//! CLI command implementations

pub mod batches;
pub mod config;
pub mod history;
pub mod import;
pub mod preview;
pub mod report;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fieldline_core::FieldlineContext;

/// Get the data directory from `FIELDLINE_DIR` or default to `~/.fieldline`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FIELDLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::home_dir()
        .context("Could not find home directory; set FIELDLINE_DIR")?
        .join(".fieldline"))
}

/// Open the data directory, creating it if needed
pub fn get_context() -> Result<FieldlineContext> {
    let data_dir = get_data_dir()?;
    tracing::debug!(data_dir = %data_dir.display(), "Opening data directory");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    FieldlineContext::new(&data_dir).context("Failed to initialize fieldline context")
}

/// File name used as the batch's source name
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
