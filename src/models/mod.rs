//! Domain model types for the schedule engine.

mod request;
mod schedule;
mod types;

pub use request::{ConflictProbe, CreateScheduleRequest, SchedulePatch};
pub(crate) use request::{validate_date_window, validate_emails, validate_recurrence};
pub use schedule::{
    ChildOccurrence, ParentSchedule, ScheduleDetails, ScheduleList, ScheduleScope, ScheduleSummary,
};
pub use types::{RecurringType, ScheduleKind, ScheduleStatus, StatusAction};
