//! Batches command - list the import ledger

use anyhow::Result;
use colored::Colorize;

use fieldline_core::ports::BatchLedger;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let batches = ctx.repository.list_batches()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(());
    }

    if batches.is_empty() {
        println!("{}", "No batches imported yet".dimmed());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "Batch", "Source", "Snapshot", "Status", "Total", "New", "Changed", "Unchanged", "Errors",
    ]);
    for b in &batches {
        table.add_row(vec![
            b.id.clone(),
            b.source_file.clone(),
            b.snapshot_date.map(|d| d.to_string()).unwrap_or_default(),
            output::status_label(b.status).to_string(),
            b.counters.total.to_string(),
            b.counters.new.to_string(),
            b.counters.changed.to_string(),
            b.counters.unchanged.to_string(),
            b.counters.error.to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}
