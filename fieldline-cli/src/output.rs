//! Output formatting utilities

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

use fieldline_core::services::{PostImportReport, PreImportReport};
use fieldline_core::BatchStatus;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn status_label(status: BatchStatus) -> ColoredString {
    match status {
        BatchStatus::Pending => status.as_str().dimmed(),
        BatchStatus::Processing => status.as_str().yellow(),
        BatchStatus::Completed => status.as_str().green(),
        BatchStatus::Failed => status.as_str().red(),
    }
}

fn blank(value: &str) -> &str {
    if value.is_empty() {
        "(blank)"
    } else {
        value
    }
}

pub fn print_pre_report(report: &PreImportReport) {
    println!("{}", format!("Pre-import report: {}", report.source_file).bold());
    println!();

    let mut table = create_table();
    table.add_row(vec!["Rows", &report.total_rows.to_string()]);
    table.add_row(vec!["Valid", &report.valid_rows.to_string()]);
    table.add_row(vec!["Missing identifier", &report.invalid_rows.to_string()]);
    table.add_row(vec!["Duplicates within CSV", &report.duplicates_within_csv.to_string()]);
    println!("{}", table);

    if !report.duplicate_identifiers.is_empty() {
        let shown: Vec<&str> = report
            .duplicate_identifiers
            .iter()
            .take(10)
            .map(|s| s.as_str())
            .collect();
        warning(&format!(
            "Repeated identifiers (last row wins): {}{}",
            shown.join(", "),
            if report.duplicate_identifiers.len() > 10 { ", ..." } else { "" }
        ));
    }

    let mut fields = create_table();
    fields.set_header(vec!["Field", "Populated", "Rate"]);
    for p in &report.field_population {
        fields.add_row(vec![
            p.field.to_string(),
            p.populated.to_string(),
            format!("{:.1}%", p.rate * 100.0),
        ]);
    }
    println!();
    println!("{}", fields);

    if !report.status_counts.is_empty() {
        let mut statuses = create_table();
        statuses.set_header(vec!["Status", "Count"]);
        for (status, count) in &report.status_counts {
            statuses.add_row(vec![blank(status).to_string(), count.to_string()]);
        }
        println!();
        println!("{}", statuses);
    }

    if !report.unbound_fields.is_empty() {
        let names: Vec<String> = report.unbound_fields.iter().map(|f| f.to_string()).collect();
        println!();
        println!("{}", format!("No column for: {}", names.join(", ")).dimmed());
    }
}

pub fn print_post_report(report: &PostImportReport) {
    println!(
        "{} {}",
        format!("Batch {}", report.batch_id).bold(),
        status_label(report.status)
    );
    if let Some(reason) = &report.failure_reason {
        error(reason);
    }
    println!();

    let mut table = create_table();
    table.add_row(vec!["Previous total", &report.previous_total.to_string()]);
    table.add_row(vec!["Added", &report.records_added.to_string()]);
    table.add_row(vec!["Updated", &report.records_updated.to_string()]);
    table.add_row(vec!["Unchanged", &report.records_unchanged.to_string()]);
    table.add_row(vec!["Errors", &report.records_errored.to_string()]);
    table.add_row(vec!["Superseded rows", &report.superseded.to_string()]);
    table.add_row(vec!["Current total", &report.current_total.to_string()]);
    if report.store_total_now != report.current_total {
        table.add_row(vec!["Store total now", &report.store_total_now.to_string()]);
    }
    if let Some(ms) = report.duration_ms {
        let rate = report
            .records_per_second
            .map(|r| format!(" ({:.0} records/s)", r))
            .unwrap_or_default();
        table.add_row(vec!["Duration".to_string(), format!("{:.1}s{}", ms as f64 / 1000.0, rate)]);
    }
    println!("{}", table);

    if !report.status_transitions.is_empty() {
        let mut transitions = create_table();
        transitions.set_header(vec!["Status change", "Records"]);
        for (change, count) in &report.status_transitions {
            transitions.add_row(vec![change.clone(), count.to_string()]);
        }
        println!();
        println!("{}", transitions);
    }

    if !report.duplicate_identifiers.is_empty() {
        warning(&format!(
            "Duplicate identifiers in store: {}",
            report.duplicate_identifiers.join(", ")
        ));
    }

    if !report.errors.is_empty() {
        println!();
        println!("{}", "Failed records".red().bold());
        for e in report.errors.iter().take(20) {
            println!("  {} {}", e.identifier, e.message.dimmed());
        }
        if report.errors.len() > 20 {
            println!("  ... and {} more", report.errors.len() - 20);
        }
    }
}
