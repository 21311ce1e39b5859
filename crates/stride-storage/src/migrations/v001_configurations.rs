//! v001: configurations, configuration_assignments (append-only history).

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS configurations (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL,
    chronic_period_days INTEGER NOT NULL CHECK (chronic_period_days BETWEEN 28 AND 90),
    decay_rate          REAL NOT NULL CHECK (decay_rate BETWEEN 0.01 AND 0.20),
    is_active           INTEGER NOT NULL DEFAULT 1,
    notes               TEXT,
    created_by          INTEGER,
    created_at          TEXT NOT NULL,
    supersedes          INTEGER REFERENCES configurations(id)
);

CREATE INDEX IF NOT EXISTS idx_configurations_active ON configurations(is_active);

CREATE TABLE IF NOT EXISTS configuration_assignments (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL,
    configuration_id INTEGER NOT NULL REFERENCES configurations(id),
    action           TEXT NOT NULL CHECK (action IN ('assign', 'unassign')),
    admin_id         INTEGER NOT NULL,
    reason           TEXT NOT NULL,
    at               TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assignments_user ON configuration_assignments(user_id, id);
CREATE INDEX IF NOT EXISTS idx_assignments_config ON configuration_assignments(configuration_id);
CREATE INDEX IF NOT EXISTS idx_assignments_admin ON configuration_assignments(admin_id);
";
