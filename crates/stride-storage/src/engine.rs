//! StorageEngine: owns the connection pool and implements the activity,
//! configuration, and migration storage traits.

use std::path::Path;

use chrono::NaiveDate;

use stride_core::config::storage_config::StorageConfig;
use stride_core::errors::StrideResult;
use stride_core::models::{
    AssignmentEvent, AssignmentFilter, Checkpoint, CheckpointState, Configuration,
    ConfigurationId, DateRange, EnhancedFields, JobFilter, LoadRecord, MigrationJob,
    NewAssignment, NewConfiguration, UserId,
};
use stride_core::traits::{IActivityLoadStore, IConfigurationStorage, IMigrationStorage};

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::{
    assignment_ops, checkpoint_ops, config_ops, job_ops, load_record_ops, maintenance,
};

pub struct StorageEngine {
    pool: ConnectionPool,
    /// False in in-memory mode, where read-pool connections are isolated
    /// databases and all reads go through the writer.
    use_read_pool: bool,
}

impl StorageEngine {
    /// Open a file-backed engine with default pool settings.
    pub fn open(path: &Path) -> StrideResult<Self> {
        Self::open_with_config(path, &StorageConfig::default())
    }

    /// Open a file-backed engine, applying schema migrations.
    pub fn open_with_config(path: &Path, config: &StorageConfig) -> StrideResult<Self> {
        let pool = ConnectionPool::open(path, config.read_pool_size, config.busy_timeout_ms)?;
        let engine = Self {
            pool,
            use_read_pool: true,
        };
        engine.initialize()?;
        tracing::info!(path = %path.display(), readers = engine.pool.readers.size(), "storage opened");
        Ok(engine)
    }

    /// In-memory engine for tests.
    pub fn open_in_memory() -> StrideResult<Self> {
        let engine = Self {
            pool: ConnectionPool::open_in_memory()?,
            use_read_pool: false,
        };
        engine.initialize()?;
        Ok(engine)
    }

    fn initialize(&self) -> StrideResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            migrations::run_migrations(conn)?;
            Ok(())
        })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn with_reader<F, T>(&self, f: F) -> StrideResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> StrideResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn_sync(f)
        }
    }

    fn with_writer<F, T>(&self, f: F) -> StrideResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> StrideResult<T>,
    {
        self.pool.writer.with_conn_sync(f)
    }

    /// Seed or replace activity records.
    pub fn upsert_records(&self, records: &[LoadRecord]) -> StrideResult<usize> {
        self.with_writer(|conn| load_record_ops::upsert_records(conn, records))
    }

    /// Number of stored records for a user.
    pub fn count_records(&self, user_id: UserId) -> StrideResult<usize> {
        self.with_reader(|conn| load_record_ops::count_records(conn, user_id))
    }

    /// Highest applied schema migration.
    pub fn schema_version(&self) -> StrideResult<u32> {
        self.with_reader(|conn| Ok(migrations::current_version(conn)?))
    }

    /// Fails with `CorruptionDetected` if SQLite reports damage.
    pub fn integrity_check(&self) -> StrideResult<()> {
        self.with_writer(maintenance::integrity_check)
    }

    /// Fold the WAL back into the main database file.
    pub fn wal_checkpoint(&self) -> StrideResult<()> {
        self.with_writer(maintenance::wal_checkpoint)
    }
}

impl IActivityLoadStore for StorageEngine {
    fn read_records(&self, user_id: UserId, range: DateRange) -> StrideResult<Vec<LoadRecord>> {
        self.with_reader(|conn| load_record_ops::read_records(conn, user_id, range))
    }

    fn write_enhanced_fields(
        &self,
        user_id: UserId,
        date: NaiveDate,
        fields: Option<&EnhancedFields>,
    ) -> StrideResult<()> {
        self.with_writer(|conn| load_record_ops::write_enhanced_fields(conn, user_id, date, fields))
    }

    fn user_ids(&self) -> StrideResult<Vec<UserId>> {
        self.with_reader(load_record_ops::user_ids)
    }
}

impl IConfigurationStorage for StorageEngine {
    fn insert_configuration(&self, config: &NewConfiguration) -> StrideResult<ConfigurationId> {
        self.with_writer(|conn| config_ops::insert_configuration(conn, config))
    }

    fn get_configuration(&self, id: ConfigurationId) -> StrideResult<Option<Configuration>> {
        self.with_reader(|conn| config_ops::get_configuration(conn, id))
    }

    fn list_configurations(&self, include_inactive: bool) -> StrideResult<Vec<Configuration>> {
        self.with_reader(|conn| config_ops::list_configurations(conn, include_inactive))
    }

    fn set_configuration_active(&self, id: ConfigurationId, active: bool) -> StrideResult<()> {
        self.with_writer(|conn| config_ops::set_configuration_active(conn, id, active))
    }

    fn append_assignment(&self, assignment: &NewAssignment) -> StrideResult<i64> {
        self.with_writer(|conn| assignment_ops::append_assignment(conn, assignment))
    }

    fn latest_assignment(&self, user_id: UserId) -> StrideResult<Option<AssignmentEvent>> {
        self.with_reader(|conn| assignment_ops::latest_assignment(conn, user_id))
    }

    fn assignment_history(&self, filter: &AssignmentFilter) -> StrideResult<Vec<AssignmentEvent>> {
        self.with_reader(|conn| assignment_ops::assignment_history(conn, filter))
    }

    fn running_migration_for_configuration(
        &self,
        id: ConfigurationId,
    ) -> StrideResult<Option<String>> {
        self.with_reader(|conn| config_ops::running_migration_for_configuration(conn, id))
    }
}

impl IMigrationStorage for StorageEngine {
    fn insert_job(&self, job: &MigrationJob) -> StrideResult<()> {
        self.with_writer(|conn| job_ops::insert_job(conn, job))
    }

    fn update_job(&self, job: &MigrationJob) -> StrideResult<()> {
        self.with_writer(|conn| job_ops::update_job(conn, job))
    }

    fn get_job(&self, migration_id: &str) -> StrideResult<Option<MigrationJob>> {
        self.with_reader(|conn| job_ops::get_job(conn, migration_id))
    }

    fn list_jobs(&self, filter: &JobFilter) -> StrideResult<Vec<MigrationJob>> {
        self.with_reader(|conn| job_ops::list_jobs(conn, filter))
    }

    fn running_job_for_user(&self, user_id: UserId) -> StrideResult<Option<MigrationJob>> {
        self.with_reader(|conn| job_ops::running_job_for_user(conn, user_id))
    }

    fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> StrideResult<()> {
        self.with_writer(|conn| checkpoint_ops::insert_checkpoint(conn, checkpoint))
    }

    fn get_checkpoint(&self, checkpoint_id: &str) -> StrideResult<Option<Checkpoint>> {
        self.with_reader(|conn| checkpoint_ops::get_checkpoint(conn, checkpoint_id))
    }

    fn checkpoints_for_migration(&self, migration_id: &str) -> StrideResult<Vec<Checkpoint>> {
        self.with_reader(|conn| checkpoint_ops::checkpoints_for_migration(conn, migration_id))
    }

    fn set_checkpoint_state(&self, checkpoint_id: &str, state: CheckpointState) -> StrideResult<()> {
        self.with_writer(|conn| checkpoint_ops::set_checkpoint_state(conn, checkpoint_id, state))
    }

    fn commit_batch(&self, checkpoint_id: &str, job: &MigrationJob) -> StrideResult<()> {
        self.with_writer(|conn| checkpoint_ops::commit_batch(conn, checkpoint_id, job))
    }

    fn archive_checkpoints(&self, migration_id: &str) -> StrideResult<usize> {
        self.with_writer(|conn| checkpoint_ops::archive_checkpoints(conn, migration_id))
    }
}
