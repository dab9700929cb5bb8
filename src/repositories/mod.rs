//! Repository layer for schedule persistence.
//!
//! The lifecycle service talks to storage through the [`ScheduleRepository`]
//! trait; the Postgres implementation backs production and the in-memory
//! implementation backs tests and embedded use.

mod memory_repo;
mod schedule_repo;

pub use memory_repo::MemoryScheduleRepository;
pub use schedule_repo::PgScheduleRepository;

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::civil;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    ChildOccurrence, ParentSchedule, RecurringType, ScheduleKind, ScheduleScope, ScheduleStatus,
};
use crate::scheduling::OccurrenceHit;

/// Everything needed to persist a freshly created parent schedule.
#[derive(Debug, Clone)]
pub struct NewScheduleRecord {
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
    pub days_of_week: Option<Vec<u8>>,
    pub status: ScheduleStatus,
    pub created_by: Option<Uuid>,
}

/// Effective (already merged) values written by a schedule update.
#[derive(Debug, Clone)]
pub struct ScheduleChanges {
    pub start_date: civil::Date,
    pub end_date: civil::Date,
    pub schedule_time: civil::Time,
    pub recipient_emails: Vec<String>,
    pub recurring_type: Option<RecurringType>,
    pub days_of_week: Option<Vec<u8>>,
    pub updated_by: Option<Uuid>,
}

/// Filter for candidate occurrences during a conflict probe.
///
/// Weekday filtering for weekly proposals happens in the conflict
/// checker, not here; the repository only narrows by scope, window,
/// time slot, blocking status and the optional parent exclusion.
#[derive(Debug, Clone)]
pub struct OccurrenceQuery {
    pub scope: ScheduleScope,
    pub start_date: civil::Date,
    pub end_date: civil::Date,
    pub schedule_time: civil::Time,
    pub exclude_parent_id: Option<Uuid>,
}

/// One row touched by a status action.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusUpdateRecord {
    pub parent_id: Uuid,
    /// None for the parent row itself.
    pub child_id: Option<Uuid>,
    pub occurrence_date: Option<civil::Date>,
    pub status: ScheduleStatus,
}

/// Per-parent execution statistics for dashboard listings.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceStats {
    pub completed: usize,
    pub pending: usize,
    pub failed: usize,
    pub next_run_date: Option<civil::Date>,
    pub last_run_date: Option<civil::Date>,
}

/// Storage contract consumed by the schedule lifecycle service.
///
/// Multi-row writes (`insert_parent_with_children`,
/// `update_parent_replace_future`) must be atomic: either every row
/// lands or none does.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Case-insensitive name probe among non-cancelled parents in scope.
    async fn name_in_use(&self, scope: &ScheduleScope, name: &str) -> AppResult<bool>;

    /// Fetches occurrences that could collide with a proposed schedule.
    async fn find_blocking_occurrences(
        &self,
        query: &OccurrenceQuery,
    ) -> AppResult<Vec<OccurrenceHit>>;

    /// Persists a parent and one child per occurrence date, atomically.
    async fn insert_parent_with_children(
        &self,
        record: NewScheduleRecord,
        dates: &[civil::Date],
    ) -> AppResult<ParentSchedule>;

    async fn find_parent(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<Option<ParentSchedule>>;

    /// Applies merged values to the parent row only. Children are left
    /// alone; used for patches that cannot change which slots exist.
    async fn update_parent(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        changes: ScheduleChanges,
    ) -> AppResult<ParentSchedule>;

    /// Applies merged values to the parent and replaces its future
    /// non-terminal children with the re-expanded `dates`. Children that
    /// already ran, and past rows, stay untouched.
    async fn update_parent_replace_future(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        changes: ScheduleChanges,
        dates: &[civil::Date],
        today: civil::Date,
    ) -> AppResult<ParentSchedule>;

    /// Writes `status` to the parent and/or its children, skipping rows
    /// already in a terminal status. With `child_id` set, only that one
    /// occurrence is targeted. Returns the rows actually updated.
    async fn update_status_where_not_terminal(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        child_id: Option<Uuid>,
        status: ScheduleStatus,
        updated_by: Option<Uuid>,
    ) -> AppResult<Vec<StatusUpdateRecord>>;

    /// All children of a parent, ascending by occurrence date.
    async fn children_of(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<Vec<ChildOccurrence>>;

    /// One page of parents in scope (newest first) plus the total count.
    async fn list_parents(
        &self,
        scope: &ScheduleScope,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<ParentSchedule>, i64)>;

    /// Execution statistics for the given parents.
    async fn occurrence_stats(
        &self,
        parent_ids: &[Uuid],
        today: civil::Date,
    ) -> AppResult<HashMap<Uuid, OccurrenceStats>>;
}
