//! v004: batch cursor on migration_jobs.
//!
//! Batches are selected by date after `last_migrated_date`, bounded by
//! `range_end`, so records inserted mid-job cannot shift committed batches.

pub const MIGRATION_SQL: &str = "
ALTER TABLE migration_jobs ADD COLUMN total_records INTEGER NOT NULL DEFAULT 0;
ALTER TABLE migration_jobs ADD COLUMN range_end TEXT;
ALTER TABLE migration_jobs ADD COLUMN last_migrated_date TEXT;
";
