//! v002: load_records. Write-back fields live in one JSON column so a
//! checkpoint payload restores them byte-for-byte.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS load_records (
    user_id      INTEGER NOT NULL,
    date         TEXT NOT NULL,
    acute_load   REAL NOT NULL,
    acute_stress REAL,
    enhanced     TEXT,
    PRIMARY KEY (user_id, date)
) WITHOUT ROWID;
";
