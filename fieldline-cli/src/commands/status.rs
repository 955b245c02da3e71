//! Status command - store and ledger summary

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Field Survey Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Records", &status.total_records.to_string()]);
    table.add_row(vec!["Batches", &status.total_batches.to_string()]);
    for (state, count) in &status.batches_by_status {
        table.add_row(vec![format!("  {}", state), count.to_string()]);
    }
    table.add_row(vec!["Change events", &status.total_change_events.to_string()]);
    table.add_row(vec!["Database size", &output::format_size(status.database_size)]);
    println!("{}", table);

    if let Some(last) = &status.last_batch {
        println!();
        println!(
            "Last batch: {} from {} ({}, {})",
            last.id, last.source_file, last.status, last.created_at
        );
    } else {
        output::info("No batches imported yet. Run `fl import <file>` to start.");
    }
    Ok(())
}
