//! Fieldline CLI - field-survey snapshot imports in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod output;

use commands::{batches, config, history, import, preview, report, status};

/// Fieldline - import weekly field-survey snapshots and track what changed
#[derive(Parser)]
#[command(name = "fl", version, about, long_about = None)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a snapshot CSV (Ctrl-C stops after the chunk in flight)
    Import {
        /// Path to the CSV export
        file: PathBuf,
        /// Batch id (default: <PROJECT>_<YYYYMMDD>_<PURPOSE>)
        #[arg(long)]
        batch_id: Option<String>,
        /// Purpose used when composing the batch id
        #[arg(long, default_value = "IMPORT")]
        purpose: String,
        /// Import even if the same content was imported before
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the data-quality report of a CSV without importing it
    Preview {
        /// Path to the CSV export
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List import batches
    Batches {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the post-import report of a batch
    Report {
        /// Batch id
        batch_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show change history for a record or a batch
    History {
        /// Record identifier
        #[arg(required_unless_present = "batch", conflicts_with = "batch")]
        identifier: Option<String>,
        /// Show the changes detected by one batch
        #[arg(long)]
        batch: Option<String>,
        /// Write the batch's changes to a CSV file
        #[arg(long, requires = "batch")]
        export: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Config {
        /// Project name used in composed batch ids
        #[arg(long)]
        project: Option<String>,
        /// Records per write chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Worker threads for lookup and classification
        #[arg(long)]
        workers: Option<usize>,
        /// Year assumed for filenames without one
        #[arg(long)]
        default_year: Option<i32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show store and ledger summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Logs go to stderr so `--json` output stays parseable.
/// Priority: RUST_LOG env var > --verbose flag > default (warn)
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import { file, batch_id, purpose, yes, json } => {
            import::run(&file, batch_id, &purpose, yes, json)
        }
        Commands::Preview { file, json } => preview::run(&file, json),
        Commands::Batches { json } => batches::run(json),
        Commands::Report { batch_id, json } => report::run(&batch_id, json),
        Commands::History { identifier, batch, export, json } => {
            history::run(identifier.as_deref(), batch.as_deref(), export.as_deref(), json)
        }
        Commands::Config { project, chunk_size, workers, default_year, json } => {
            config::run(config::Changes { project, chunk_size, workers, default_year }, json)
        }
        Commands::Status { json } => status::run(json),
    }
}
