use jiff::civil;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RecurringType, ScheduleKind, ScheduleStatus};

/// The (application, brand, platform) namespace a schedule lives in.
///
/// Names are unique and conflicts are checked within a single scope;
/// operations on different scopes never contend with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleScope {
    pub app_id: Uuid,
    pub brand_id: Uuid,
    pub platform_id: Uuid,
}

/// One logical recurring or one-time job definition.
#[derive(Debug, Clone, Serialize)]
pub struct ParentSchedule {
    pub parent_id: Uuid,
    pub scope: ScheduleScope,
    pub schedule_name: String,
    pub file_reference: String,
    pub file_name: String,
    pub recipient_emails: Vec<String>,
    pub schedule_kind: ScheduleKind,
    pub recurring_type: Option<RecurringType>,
    pub start_date: civil::Date,
    pub end_date: civil::Date,
    pub schedule_time: civil::Time,
    /// 0 = Sunday .. 6 = Saturday; present iff the schedule is weekly.
    pub days_of_week: Option<Vec<u8>>,
    pub status: ScheduleStatus,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: civil::DateTime,
    pub updated_at: civil::DateTime,
}

/// One concrete dated execution slot derived from a parent schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ChildOccurrence {
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub occurrence_date: civil::Date,
    pub schedule_time: civil::Time,
    pub status: ScheduleStatus,
}

/// Parent plus its expanded children, with per-status tallies.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDetails {
    pub parent: ParentSchedule,
    pub children: Vec<ChildOccurrence>,
    pub total_children: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
}

/// Dashboard row: a parent with execution statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub parent: ParentSchedule,
    pub completed_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
    /// Earliest still-blocking occurrence on or after today.
    pub next_run_date: Option<civil::Date>,
    /// Latest occurrence that already ran, successfully or not.
    pub last_run_date: Option<civil::Date>,
}

/// One page of schedule summaries.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleList {
    pub schedules: Vec<ScheduleSummary>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl ScheduleDetails {
    /// Builds the detail view from a parent and its ordered children.
    pub fn new(parent: ParentSchedule, children: Vec<ChildOccurrence>) -> Self {
        let completed_count = children
            .iter()
            .filter(|c| c.status == ScheduleStatus::Success)
            .count();
        let pending_count = children
            .iter()
            .filter(|c| c.status.blocks_new_occurrences())
            .count();
        let failed_count = children
            .iter()
            .filter(|c| c.status == ScheduleStatus::Failed)
            .count();
        Self {
            total_children: children.len(),
            completed_count,
            pending_count,
            failed_count,
            parent,
            children,
        }
    }
}
