//! Database migrations - embedded SQL files
//!
//! Each migration is a tuple of (name, sql_content), compiled in with
//! include_str! and applied in order.

/// All migrations, embedded at compile time.
///
/// When adding a migration, create `NNN_description.sql` next to this file
/// and append an entry here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_batch_store_count.sql", include_str!("002_batch_store_count.sql")),
];
