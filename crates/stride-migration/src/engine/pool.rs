//! Parallel execution of migrations for many users.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use stride_core::errors::{StrideError, StrideResult};
use stride_core::models::{ConfigurationId, MigrationJob, UserId};

use super::MigrationEngine;

/// One user's migration request for [`MigrationEngine::run_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub user_id: UserId,
    pub target_configuration_id: ConfigurationId,
    /// Falls back to `MigrationConfig::default_batch_size`.
    pub batch_size: Option<usize>,
}

impl MigrationRequest {
    /// Request a migration of `user_id` with the default batch size.
    pub fn new(user_id: UserId, target_configuration_id: ConfigurationId) -> Self {
        Self {
            user_id,
            target_configuration_id,
            batch_size: None,
        }
    }
}

impl MigrationEngine {
    /// Start every request, then run the started jobs on a bounded worker
    /// pool. Results are returned in request order.
    ///
    /// Jobs are started in request order, so a second request for the same
    /// user fails with `ConcurrencyConflict` without affecting the first.
    pub fn run_many(&self, requests: &[MigrationRequest]) -> StrideResult<Vec<StrideResult<MigrationJob>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_pool_size.max(1))
            .thread_name(|i| format!("stride-migration-{i}"))
            .build()
            .map_err(|e| StrideError::ConcurrencyError(format!("worker pool: {e}")))?;

        let mut results: Vec<Option<StrideResult<MigrationJob>>> = Vec::with_capacity(requests.len());
        let mut started: Vec<(usize, String)> = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            let batch_size = request.batch_size.unwrap_or(self.config.default_batch_size);
            match self.start(request.user_id, request.target_configuration_id, batch_size) {
                Ok(job) => {
                    started.push((index, job.migration_id));
                    results.push(None);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        tracing::info!(
            event = "migration_batch_run",
            requested = requests.len(),
            started = started.len(),
            workers = pool.current_num_threads(),
            "running migrations"
        );

        let finished: Vec<(usize, StrideResult<MigrationJob>)> = pool.install(|| {
            started
                .par_iter()
                .map(|(index, migration_id)| (*index, self.run(migration_id)))
                .collect()
        });
        for (index, outcome) in finished {
            results[index] = Some(outcome);
        }

        Ok(results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(StrideError::ConcurrencyError("migration result missing".to_string()))
                })
            })
            .collect())
    }
}
