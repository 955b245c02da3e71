//! History command - field changes of a record or a batch

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use fieldline_core::ChangeEvent;

use super::get_context;
use crate::output;

pub fn run(identifier: Option<&str>, batch: Option<&str>, export: Option<&Path>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if let (Some(batch_id), Some(path)) = (batch, export) {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let written = ctx.history_service.export_batch(batch_id, BufWriter::new(file))?;
        output::success(&format!("Exported {} changes to {}", written, path.display()));
        return Ok(());
    }

    let (events, title) = match (identifier, batch) {
        (Some(id), _) => (ctx.history_service.for_record(id)?, format!("Record {}", id)),
        (None, Some(batch_id)) => (ctx.history_service.for_batch(batch_id)?, format!("Batch {}", batch_id)),
        (None, None) => anyhow::bail!("Give a record identifier or --batch"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", format!("No changes recorded for {}", title).dimmed());
        return Ok(());
    }

    println!("{}", title.bold());
    print_events(&events);
    Ok(())
}

fn print_events(events: &[ChangeEvent]) {
    let mut table = output::create_table();
    table.set_header(vec!["Detected", "Batch", "Record", "Field", "Old", "New"]);
    for e in events {
        table.add_row(vec![
            e.detected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            e.batch_id.clone(),
            e.record_identifier.clone(),
            e.field.to_string(),
            e.old_value.clone(),
            e.new_value.clone(),
        ]);
    }
    println!("{}", table);
}
