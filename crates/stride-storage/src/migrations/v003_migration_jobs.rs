//! v003: migration_jobs, migration_checkpoints.
//!
//! The partial unique index enforces at most one running job per user.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS migration_jobs (
    migration_id            TEXT PRIMARY KEY,
    user_id                 INTEGER NOT NULL,
    target_configuration_id INTEGER NOT NULL REFERENCES configurations(id),
    status                  TEXT NOT NULL,
    batch_size              INTEGER NOT NULL,
    current_batch           INTEGER NOT NULL DEFAULT 0,
    total_batches           INTEGER NOT NULL,
    processed_count         INTEGER NOT NULL DEFAULT 0,
    success_count           INTEGER NOT NULL DEFAULT 0,
    failure_count           INTEGER NOT NULL DEFAULT 0,
    failure_batch           INTEGER,
    failure_reason          TEXT,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_one_running_per_user
    ON migration_jobs(user_id) WHERE status = 'running';
CREATE INDEX IF NOT EXISTS idx_jobs_user ON migration_jobs(user_id);
CREATE INDEX IF NOT EXISTS idx_jobs_target ON migration_jobs(target_configuration_id, status);

CREATE TABLE IF NOT EXISTS migration_checkpoints (
    checkpoint_id    TEXT PRIMARY KEY,
    migration_id     TEXT NOT NULL REFERENCES migration_jobs(migration_id),
    user_id          INTEGER NOT NULL,
    batch_index      INTEGER NOT NULL,
    timestamp        TEXT NOT NULL,
    data_snapshot    TEXT NOT NULL,
    checksum         TEXT NOT NULL,
    rollback_payload TEXT NOT NULL,
    state            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_migration
    ON migration_checkpoints(migration_id, batch_index, timestamp);
CREATE INDEX IF NOT EXISTS idx_checkpoints_user ON migration_checkpoints(user_id);
";
