//! Conflict evaluation for proposed schedules.
//!
//! The repository narrows candidates down to occurrences in the same
//! scope, date window, time slot and a blocking status (excluding the
//! edited parent when asked to); this module applies the weekday rule
//! for weekly proposals and shapes the result. Splitting it this way
//! keeps the collision semantics in application code, portable across
//! storage engines.

use jiff::civil;
use serde::Serialize;

use crate::models::RecurringType;

/// Candidate occurrence row fetched for a conflict probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceHit {
    pub date: civil::Date,
    pub schedule_name: String,
}

/// One colliding date. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub date: civil::Date,
    pub schedule_name: String,
}

/// Outcome of a conflict check, conflicts ascending by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn clear() -> Self {
        Self {
            has_conflict: false,
            conflicts: Vec::new(),
        }
    }
}

/// Evaluates fetched candidates against the proposed recurrence pattern.
///
/// Daily proposals collide with any candidate. Weekly proposals collide
/// only with candidates falling on one of the requested days of week
/// (0 = Sunday .. 6 = Saturday). Pure and idempotent: identical inputs
/// always produce an identical report.
pub fn evaluate(
    mut hits: Vec<OccurrenceHit>,
    recurring_type: RecurringType,
    days_of_week: Option<&[u8]>,
) -> ConflictReport {
    if recurring_type == RecurringType::Weekly {
        let days = days_of_week.unwrap_or_default();
        hits.retain(|hit| days.contains(&(hit.date.weekday().to_sunday_zero_offset() as u8)));
    }

    hits.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.schedule_name.cmp(&b.schedule_name))
    });

    let conflicts: Vec<Conflict> = hits
        .into_iter()
        .map(|hit| Conflict {
            date: hit.date,
            schedule_name: hit.schedule_name,
        })
        .collect();

    ConflictReport {
        has_conflict: !conflicts.is_empty(),
        conflicts,
    }
}
