use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::configuration::ConfigurationId;
use super::load_record::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentAction {
    Assign,
    Unassign,
}

impl AssignmentAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Unassign => "unassign",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assign" => Some(Self::Assign),
            "unassign" => Some(Self::Unassign),
            _ => None,
        }
    }
}

/// One row of the append-only assignment history.
///
/// For `Unassign` rows `configuration_id` is the configuration being removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub id: i64,
    pub user_id: UserId,
    pub configuration_id: ConfigurationId,
    pub action: AssignmentAction,
    pub admin_id: UserId,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Assignment row before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub user_id: UserId,
    pub configuration_id: ConfigurationId,
    pub action: AssignmentAction,
    pub admin_id: UserId,
    pub reason: String,
}

/// History filter; unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFilter {
    pub user_id: Option<UserId>,
    pub configuration_id: Option<ConfigurationId>,
    pub admin_id: Option<UserId>,
}

impl AssignmentFilter {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, event: &AssignmentEvent) -> bool {
        self.user_id.map_or(true, |u| u == event.user_id)
            && self
                .configuration_id
                .map_or(true, |c| c == event.configuration_id)
            && self.admin_id.map_or(true, |a| a == event.admin_id)
    }
}
