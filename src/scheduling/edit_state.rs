//! Edit-state classification and mutation rules for existing schedules.

use jiff::civil;
use jiff::ToSpan;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{ParentSchedule, SchedulePatch};

/// Lifecycle phase of a schedule's date window relative to `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditCase {
    /// Every date has passed; the schedule is frozen.
    Passed,
    /// The window includes today; only recipients and end date may move.
    Running,
    /// The window is entirely in the future; everything may change.
    Upcoming,
}

impl std::fmt::Display for EditCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditCase::Passed => write!(f, "PASSED"),
            EditCase::Running => write!(f, "RUNNING"),
            EditCase::Upcoming => write!(f, "UPCOMING"),
        }
    }
}

/// Classifies a date window. Rules apply in priority order, first match
/// wins, so the result is total for any input.
pub fn classify(today: civil::Date, start: civil::Date, end: civil::Date) -> EditCase {
    if end < today {
        EditCase::Passed
    } else if start <= today {
        EditCase::Running
    } else {
        EditCase::Upcoming
    }
}

/// Rejects patch fields the schedule's edit case does not allow.
pub fn ensure_patch_allowed(
    case: EditCase,
    current: &ParentSchedule,
    patch: &SchedulePatch,
) -> AppResult<()> {
    match case {
        EditCase::Passed => Err(AppError::ImmutableSchedule {
            parent_id: current.parent_id,
        }),
        EditCase::Running => {
            if patch
                .schedule_time
                .is_some_and(|t| t != current.schedule_time)
            {
                return Err(AppError::ImmutableField {
                    field: "schedule_time",
                });
            }
            if patch.start_date.is_some_and(|d| d != current.start_date) {
                return Err(AppError::ImmutableField {
                    field: "start_date",
                });
            }
            if patch
                .recurring_type
                .is_some_and(|r| Some(r) != current.recurring_type)
            {
                return Err(AppError::ImmutableField {
                    field: "recurring_type",
                });
            }
            if patch
                .days_of_week
                .as_ref()
                .is_some_and(|d| Some(d) != current.days_of_week.as_ref())
            {
                return Err(AppError::ImmutableField {
                    field: "days_of_week",
                });
            }
            Ok(())
        }
        EditCase::Upcoming => Ok(()),
    }
}

/// One-hour lead-time guard for schedule_time changes.
///
/// When the effective date window includes today, the new time slot on
/// today's date must sit at least one hour past `now`. Evaluated against
/// the merged (post-patch) window, so it also fires for an upcoming
/// schedule being pulled forward to start today.
pub fn ensure_lead_time(
    now: civil::DateTime,
    new_time: civil::Time,
    start: civil::Date,
    end: civil::Date,
) -> AppResult<()> {
    let today = now.date();
    if start <= today && today <= end {
        let earliest = now.saturating_add(1.hour());
        if today.to_datetime(new_time) < earliest {
            return Err(AppError::TooSoon { earliest });
        }
    }
    Ok(())
}
