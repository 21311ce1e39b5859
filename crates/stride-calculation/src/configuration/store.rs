use std::collections::BTreeSet;
use std::sync::Arc;

use stride_core::errors::{ConfigurationError, StrideResult};
use stride_core::models::{
    validate_chronic_period_days, validate_decay_rate, AssignmentAction, AssignmentEvent,
    AssignmentFilter, Configuration, ConfigurationId, NewAssignment, NewConfiguration, UserId,
};
use stride_core::traits::IConfigurationStorage;
use stride_observability::tracing_setup::events;

/// The only mutation path for configurations and assignments.
///
/// Configurations are immutable once stored. Assignment history is
/// append-only: a user's active configuration is whatever their newest
/// history row says.
pub struct ConfigurationStore {
    storage: Arc<dyn IConfigurationStorage>,
}

impl ConfigurationStore {
    /// Store backed by `storage`.
    pub fn new(storage: Arc<dyn IConfigurationStorage>) -> Self {
        Self { storage }
    }

    /// Validate and persist a configuration. Nothing is written on rejection.
    pub fn create(&self, config: NewConfiguration) -> StrideResult<ConfigurationId> {
        if let Err(e) = config.validate() {
            if let ConfigurationError::InvalidRange { field, value, .. } = &e {
                events::configuration_rejected(field, value);
            }
            return Err(e.into());
        }
        let id = self.storage.insert_configuration(&config)?;
        events::configuration_created(id, config.chronic_period_days, config.decay_rate);
        Ok(id)
    }

    /// A configuration by id, active or not.
    pub fn get(&self, id: ConfigurationId) -> StrideResult<Configuration> {
        self.storage
            .get_configuration(id)?
            .ok_or_else(|| ConfigurationError::NotFound { id }.into())
    }

    /// All configurations, oldest first.
    pub fn list(&self, include_inactive: bool) -> StrideResult<Vec<Configuration>> {
        self.storage.list_configurations(include_inactive)
    }

    /// The configuration the user is currently assigned, if it is still active.
    pub fn get_active_for_user(&self, user_id: UserId) -> StrideResult<Option<Configuration>> {
        let Some(latest) = self.storage.latest_assignment(user_id)? else {
            return Ok(None);
        };
        if latest.action != AssignmentAction::Assign {
            return Ok(None);
        }
        let config = self.storage.get_configuration(latest.configuration_id)?;
        Ok(config.filter(|c| c.is_active))
    }

    /// Assign a configuration, superseding any previous assignment.
    /// Returns the history row id.
    pub fn assign(
        &self,
        user_id: UserId,
        configuration_id: ConfigurationId,
        admin_id: UserId,
        reason: &str,
    ) -> StrideResult<i64> {
        let config = self.get(configuration_id)?;
        if !config.is_active {
            return Err(ConfigurationError::Inactive { id: configuration_id }.into());
        }
        let row = self.storage.append_assignment(&NewAssignment {
            user_id,
            configuration_id,
            action: AssignmentAction::Assign,
            admin_id,
            reason: reason.to_string(),
        })?;
        events::configuration_assigned(user_id, configuration_id, admin_id);
        Ok(row)
    }

    /// Remove the user's assignment. `false` when there was none to remove.
    pub fn unassign(&self, user_id: UserId, admin_id: UserId, reason: &str) -> StrideResult<bool> {
        let current = match self.storage.latest_assignment(user_id)? {
            Some(event) if event.action == AssignmentAction::Assign => event,
            _ => return Ok(false),
        };
        self.storage.append_assignment(&NewAssignment {
            user_id,
            configuration_id: current.configuration_id,
            action: AssignmentAction::Unassign,
            admin_id,
            reason: reason.to_string(),
        })?;
        events::configuration_unassigned(user_id, current.configuration_id, admin_id);
        Ok(true)
    }

    /// Assignment history, most recent first.
    pub fn history(&self, filter: &AssignmentFilter) -> StrideResult<Vec<AssignmentEvent>> {
        self.storage.assignment_history(filter)
    }

    /// Users whose current assignment points at `id`.
    pub fn users_assigned_to(&self, id: ConfigurationId) -> StrideResult<Vec<UserId>> {
        let candidates: BTreeSet<UserId> = self
            .history(&AssignmentFilter {
                configuration_id: Some(id),
                ..AssignmentFilter::default()
            })?
            .into_iter()
            .map(|e| e.user_id)
            .collect();

        let mut users = Vec::new();
        for user_id in candidates {
            if let Some(latest) = self.storage.latest_assignment(user_id)? {
                if latest.action == AssignmentAction::Assign && latest.configuration_id == id {
                    users.push(user_id);
                }
            }
        }
        Ok(users)
    }

    /// Replace a configuration's parameters.
    ///
    /// Creates a new configuration that supersedes `id`, deactivates `id`,
    /// and moves every user currently assigned to `id` onto the revision.
    pub fn revise(
        &self,
        id: ConfigurationId,
        chronic_period_days: u32,
        decay_rate: f64,
        admin_id: UserId,
    ) -> StrideResult<ConfigurationId> {
        validate_chronic_period_days(chronic_period_days)?;
        validate_decay_rate(decay_rate)?;
        let previous = self.get(id)?;
        self.ensure_not_migrating(id)?;

        let new_id = self.storage.insert_configuration(&NewConfiguration {
            name: previous.name.clone(),
            chronic_period_days,
            decay_rate,
            notes: previous.notes.clone(),
            created_by: Some(admin_id),
            supersedes: Some(id),
        })?;
        let users = self.users_assigned_to(id)?;
        self.storage.set_configuration_active(id, false)?;

        let reason = format!("configuration {id} revised as {new_id}");
        for user_id in users {
            self.storage.append_assignment(&NewAssignment {
                user_id,
                configuration_id: new_id,
                action: AssignmentAction::Assign,
                admin_id,
                reason: reason.clone(),
            })?;
        }
        events::configuration_revised(id, new_id, admin_id);
        Ok(new_id)
    }

    /// Deactivate a configuration. Users assigned to it fall back to the
    /// standard method until reassigned.
    pub fn deactivate(&self, id: ConfigurationId) -> StrideResult<()> {
        self.get(id)?;
        self.ensure_not_migrating(id)?;
        self.storage.set_configuration_active(id, false)?;
        events::configuration_deactivated(id);
        Ok(())
    }

    fn ensure_not_migrating(&self, id: ConfigurationId) -> StrideResult<()> {
        match self.storage.running_migration_for_configuration(id)? {
            Some(migration_id) => {
                Err(ConfigurationError::InUseByMigration { id, migration_id }.into())
            }
            None => Ok(()),
        }
    }
}
