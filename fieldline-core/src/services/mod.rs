//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod detector;
mod history;
pub mod import;
pub mod locks;
pub mod migration;
pub mod parser;
pub mod report;
mod status;

pub use detector::{classify, diff_tracked, ChangeKind, Classification};
pub use history::HistoryService;
pub use import::{
    collapse_duplicates, AbortHandle, ImportCoordinator, ImportOptions, ImportOutcome,
    PreparedImport,
};
pub use locks::{IdentifierGuard, IdentifierLocks};
pub use migration::{MigrationResult, MigrationService};
pub use parser::{split_line, CsvParser, HeaderBinding, ParsedCsv, RowOutcome, Rows};
pub use report::{FieldPopulation, PostImportReport, PreImportReport, ReportService};
pub use status::{LastBatch, StatusService, StatusSummary};
