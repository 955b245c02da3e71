//! Import command - ingest one snapshot CSV

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use fieldline_core::compose_batch_id;
use fieldline_core::domain::snapshot_date_from_filename;
use fieldline_core::services::{AbortHandle, PreImportReport};

use super::{get_context, source_name};
use crate::output;

pub fn run(file: &Path, batch_id: Option<String>, purpose: &str, yes: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let source_file = source_name(file);
    let coordinator = ctx.import_coordinator();

    let prepared = std::fs::read_to_string(file)
        .map_err(|e| fieldline_core::Error::unreadable(format!("{}: {}", file.display(), e)))
        .and_then(|text| coordinator.prepare(&source_file, &text));

    let batch_id = batch_id.unwrap_or_else(|| {
        let date = snapshot_date_from_filename(&source_file, ctx.config.default_year)
            .unwrap_or_else(|| Local::now().date_naive());
        let project = ctx.config.project.as_deref().unwrap_or("FIELDLINE");
        compose_batch_id(project, date, purpose)
    });

    let prepared = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            coordinator.record_rejected(&batch_id, &source_file, &e)?;
            return Err(e).with_context(|| format!("Batch {} failed", batch_id));
        }
    };

    let pre_report = PreImportReport::from_parsed(&source_file, &prepared.parsed);
    if !json {
        output::print_pre_report(&pre_report);
        println!();
    }

    let previous = coordinator.previous_imports_of(&prepared)?;
    if !previous.is_empty() && !yes {
        let ids: Vec<&str> = previous.iter().map(|b| b.id.as_str()).collect();
        if !atty::is(atty::Stream::Stdin) {
            bail!(
                "Identical content was already imported by {}; pass --yes to import again",
                ids.join(", ")
            );
        }
        output::warning(&format!(
            "Identical content was already imported by {}",
            ids.join(", ")
        ));
        if !Confirm::new()
            .with_prompt("Import it again?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let coordinator = if !json && atty::is(atty::Stream::Stderr) {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} records {msg}")?
                .progress_chars("=> "),
        );
        bar.set_message(batch_id.clone());
        coordinator.with_progress(move |batch| {
            bar.set_length(batch.counters.total);
            bar.set_position(batch.counters.processed());
            if batch.counters.processed() >= batch.counters.total {
                bar.finish_and_clear();
            }
        })
    } else {
        coordinator
    };

    abort_on_interrupt(coordinator.abort_handle())?;
    let outcome = coordinator
        .import_prepared(&batch_id, &prepared)
        .with_context(|| format!("Batch {} failed", batch_id))?;
    let post_report = ctx.report_service.post_import(&outcome.batch.id)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "preImport": pre_report,
                "postImport": post_report,
                "changeEvents": outcome.change_events,
                "chunks": outcome.chunks,
            }))?
        );
    } else {
        output::print_post_report(&post_report);
        println!();
        if post_report.failure_reason.is_none() {
            output::success(&format!(
                "Imported {} records into batch {} ({} changes recorded)",
                outcome.batch.counters.processed(),
                outcome.batch.id,
                outcome.change_events
            ));
        }
    }

    if let Some(reason) = outcome.batch.failure_reason {
        bail!("Batch {} failed: {}", outcome.batch.id, reason);
    }
    Ok(())
}

/// Stop scheduling chunks on the first Ctrl-C; a second one exits at once
fn abort_on_interrupt(handle: AbortHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start interrupt handler")?;

    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::warn!("Interrupted, stopping after the current chunk");
            handle.abort();

            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
    Ok(())
}
