//! StrideRuntime: construction and convenience entry points.
//!
//! Subsystems share the storage engine and the monitoring sink by `Arc`.
//! There is no process-global instance; callers hold the runtime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use stride_calculation::{
    CalculationOrchestrator, ConfigurationStore, DivergenceReport, StaticFeatureGate,
};
use stride_core::config::StrideConfig;
use stride_core::errors::{StrideError, StrideResult};
use stride_core::models::{CalculationResult, DateRange, UserId};
use stride_core::traits::IActivityLoadStore;
use stride_migration::{IntegrityManager, MigrationEngine, RollbackManager};
use stride_observability::tracing_setup::init_tracing_with_default;
use stride_observability::MonitoringSink;
use stride_storage::StorageEngine;

/// Options for building a runtime.
#[derive(Debug, Default, Clone)]
pub struct RuntimeOptions {
    /// Overrides `storage.db_path` from the configuration.
    pub db_path: Option<PathBuf>,
    /// TOML configuration string. Takes precedence over `config_path`.
    pub config_toml: Option<String>,
    /// TOML configuration file. Defaults apply when neither source is set.
    pub config_path: Option<PathBuf>,
    /// Keep everything in memory; no database file is created.
    pub in_memory: bool,
    /// Install the JSON tracing subscriber at `monitoring.log_level`.
    pub init_tracing: bool,
}

pub struct StrideRuntime {
    pub config: StrideConfig,
    pub storage: Arc<StorageEngine>,
    pub gate: Arc<StaticFeatureGate>,
    pub configurations: Arc<ConfigurationStore>,
    pub orchestrator: Arc<CalculationOrchestrator>,
    pub monitor: Arc<MonitoringSink>,
    pub integrity: Arc<IntegrityManager>,
    pub migrations: Arc<MigrationEngine>,
    pub rollback: Arc<RollbackManager>,
}

impl StrideRuntime {
    /// Load configuration, open storage and wire every service.
    pub fn open(opts: RuntimeOptions) -> StrideResult<Self> {
        let config = resolve_config(&opts)?;
        if opts.init_tracing {
            init_tracing_with_default(&config.monitoring.log_level);
        }

        let storage = if opts.in_memory {
            StorageEngine::open_in_memory()?
        } else {
            let db_path = opts
                .db_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.storage.db_path));
            ensure_parent_dir(&db_path)?;
            StorageEngine::open_with_config(&db_path, &config.storage)?
        };
        Ok(Self::assemble(config, Arc::new(storage)))
    }

    /// In-memory runtime with the given configuration.
    pub fn in_memory(config: StrideConfig) -> StrideResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, Arc::new(StorageEngine::open_in_memory()?)))
    }

    fn assemble(config: StrideConfig, storage: Arc<StorageEngine>) -> Self {
        let gate = Arc::new(StaticFeatureGate::from_config(
            &config.calculation,
            &config.feature_gate,
        ));
        let configurations = Arc::new(ConfigurationStore::new(storage.clone()));
        let orchestrator = Arc::new(CalculationOrchestrator::new(
            configurations.clone(),
            gate.clone(),
            config.calculation.clone(),
        ));
        let monitor = Arc::new(MonitoringSink::new(&config.monitoring));
        let integrity = Arc::new(IntegrityManager::new(storage.clone(), &config.migration));
        let migrations = Arc::new(MigrationEngine::new(
            storage.clone(),
            storage.clone(),
            configurations.clone(),
            orchestrator.clone(),
            integrity.clone(),
            monitor.clone(),
            config.migration.clone(),
        ));
        let rollback = Arc::new(RollbackManager::new(
            storage.clone(),
            storage.clone(),
            integrity.clone(),
            monitor.clone(),
            &config.migration,
        ));

        tracing::info!(
            event = "runtime_ready",
            version = stride_core::constants::VERSION,
            workers = config.migration.worker_pool_size,
            "stride runtime ready"
        );

        Self {
            config,
            storage,
            gate,
            configurations,
            orchestrator,
            monitor,
            integrity,
            migrations,
            rollback,
        }
    }

    /// Calculate `user_id`'s ratios at `reference_date` from stored history.
    pub fn calculate(&self, user_id: UserId, reference_date: NaiveDate) -> StrideResult<CalculationResult> {
        let records = self
            .storage
            .read_records(user_id, DateRange::until(reference_date))?;
        Ok(self.orchestrator.calculate(user_id, &records, reference_date))
    }

    /// Calculate and store the result on the record for `reference_date`.
    pub fn calculate_and_store(
        &self,
        user_id: UserId,
        reference_date: NaiveDate,
    ) -> StrideResult<CalculationResult> {
        let result = self.calculate(user_id, reference_date)?;
        self.storage.write_enhanced_fields(
            user_id,
            reference_date,
            Some(&result.to_enhanced_fields()),
        )?;
        Ok(result)
    }

    /// Divergence summary of `user_id`'s stored write-back fields.
    pub fn divergence_report(&self, user_id: UserId, range: DateRange) -> StrideResult<DivergenceReport> {
        let records = self.storage.read_records(user_id, range)?;
        Ok(DivergenceReport::from_records(&records))
    }

    /// Flush the WAL. Call before process exit.
    pub fn shutdown(&self) -> StrideResult<()> {
        self.storage.wal_checkpoint()
    }
}

fn resolve_config(opts: &RuntimeOptions) -> StrideResult<StrideConfig> {
    let config = match (&opts.config_toml, &opts.config_path) {
        (Some(toml_str), _) => {
            let config = StrideConfig::from_toml(toml_str)
                .map_err(|e| StrideError::ConfigError(e.to_string()))?;
            config.validate()?;
            config
        }
        (None, Some(path)) => StrideConfig::load(path)?,
        (None, None) => StrideConfig::default(),
    };
    Ok(config)
}

fn ensure_parent_dir(path: &Path) -> StrideResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| StrideError::ConfigError(format!("{}: {e}", parent.display()))),
        _ => Ok(()),
    }
}
