use crate::errors::StrideResult;
use crate::models::{
    AssignmentEvent, AssignmentFilter, Configuration, ConfigurationId, NewAssignment,
    NewConfiguration, UserId,
};

/// Persistence for configurations and the append-only assignment history.
pub trait IConfigurationStorage: Send + Sync {
    // --- Configurations ---
    fn insert_configuration(&self, config: &NewConfiguration) -> StrideResult<ConfigurationId>;
    fn get_configuration(&self, id: ConfigurationId) -> StrideResult<Option<Configuration>>;
    fn list_configurations(&self, include_inactive: bool) -> StrideResult<Vec<Configuration>>;
    fn set_configuration_active(&self, id: ConfigurationId, active: bool) -> StrideResult<()>;

    // --- Assignments ---
    fn append_assignment(&self, assignment: &NewAssignment) -> StrideResult<i64>;
    /// Most recent history row for the user, whatever its action.
    fn latest_assignment(&self, user_id: UserId) -> StrideResult<Option<AssignmentEvent>>;
    /// Matching rows, most recent first.
    fn assignment_history(&self, filter: &AssignmentFilter) -> StrideResult<Vec<AssignmentEvent>>;

    // --- Cross-checks ---
    /// Id of a `Running` migration targeting this configuration, if any.
    fn running_migration_for_configuration(
        &self,
        id: ConfigurationId,
    ) -> StrideResult<Option<String>>;
}
