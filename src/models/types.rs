use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle status shared by parent schedules and child occurrences.
///
/// `Success` and `Failed` are terminal per row and are never overwritten
/// by status actions. `Active` and `Upcoming` are the statuses that block
/// new occurrences during conflict checking; a `Paused` occurrence frees
/// its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum)]
#[db_enum(
    existing_type_path = "crate::schema::sql_types::ScheduleStatus",
    value_style = "SCREAMING_SNAKE_CASE"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Upcoming,
    Active,
    Paused,
    Cancelled,
    Success,
    Failed,
}

impl ScheduleStatus {
    /// An occurrence that already ran (either way) may never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScheduleStatus::Success | ScheduleStatus::Failed)
    }

    /// Whether an occurrence in this status occupies its date/time slot.
    pub fn blocks_new_occurrences(self) -> bool {
        matches!(self, ScheduleStatus::Active | ScheduleStatus::Upcoming)
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStatus::Upcoming => write!(f, "UPCOMING"),
            ScheduleStatus::Active => write!(f, "ACTIVE"),
            ScheduleStatus::Paused => write!(f, "PAUSED"),
            ScheduleStatus::Cancelled => write!(f, "CANCELLED"),
            ScheduleStatus::Success => write!(f, "SUCCESS"),
            ScheduleStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Whether a schedule runs once per expansion window or keeps recurring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[db_enum(
    existing_type_path = "crate::schema::sql_types::ScheduleKind",
    value_style = "SCREAMING_SNAKE_CASE"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleKind {
    OneTime,
    Recurring,
}

/// Recurrence pattern for recurring schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[db_enum(
    existing_type_path = "crate::schema::sql_types::RecurringType",
    value_style = "SCREAMING_SNAKE_CASE"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringType {
    Daily,
    Weekly,
}

/// Status transition requested against a schedule or a single occurrence.
///
/// The action-to-status mapping is an explicit table so the state machine
/// stays auditable in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusAction {
    Pause,
    Resume,
    Active,
    Cancel,
}

impl StatusAction {
    /// Target status written by this action.
    pub fn target_status(self) -> ScheduleStatus {
        match self {
            StatusAction::Pause => ScheduleStatus::Paused,
            StatusAction::Resume => ScheduleStatus::Active,
            StatusAction::Active => ScheduleStatus::Active,
            StatusAction::Cancel => ScheduleStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusAction::Pause => write!(f, "PAUSE"),
            StatusAction::Resume => write!(f, "RESUME"),
            StatusAction::Active => write!(f, "ACTIVE"),
            StatusAction::Cancel => write!(f, "CANCEL"),
        }
    }
}
