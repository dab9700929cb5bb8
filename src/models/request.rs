use jiff::civil;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::error::{AppError, AppResult};
use crate::models::{RecurringType, ScheduleKind};

/// Payload for creating a new parent schedule.
///
/// Structural rules live in the `Validate` derive; cross-field and
/// date-sensitive rules are checked by [`CreateScheduleRequest::validate_for_create`]
/// before any I/O happens.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 3, max = 100, message = "Schedule name must be between 3 and 100 characters"))]
    pub schedule_name: String,
    #[validate(length(min = 10, max = 500, message = "file_reference must be between 10 and 500 characters"))]
    pub file_reference: String,
    #[validate(length(min = 3, max = 255, message = "file_name must be between 3 and 255 characters"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "At least one recipient email is required"))]
    pub recipient_emails: Vec<String>,
    pub schedule_kind: ScheduleKind,
    pub recurring_type: Option<RecurringType>,
    pub start_date: civil::Date,
    pub end_date: civil::Date,
    pub schedule_time: civil::Time,
    /// 0 = Sunday .. 6 = Saturday; required iff the schedule is weekly.
    pub days_of_week: Option<Vec<u8>>,
}

impl CreateScheduleRequest {
    /// Runs every creation-time invariant against the provided `today`.
    pub fn validate_for_create(&self, today: civil::Date) -> AppResult<()> {
        self.validate()?;
        validate_emails(&self.recipient_emails)?;
        validate_date_window(self.start_date, self.end_date)?;
        if self.start_date < today {
            return Err(AppError::validation(
                "start_date",
                "Start date cannot be in the past",
            ));
        }
        if self.schedule_kind == ScheduleKind::Recurring && self.recurring_type.is_none() {
            return Err(AppError::validation(
                "recurring_type",
                "recurring_type is required for recurring schedules",
            ));
        }
        validate_recurrence(self.recurring_type, self.days_of_week.as_deref())
    }
}

/// Standalone conflict probe, as issued by a client before creation or
/// while editing (`exclude_parent_id` set to the schedule being edited).
#[derive(Debug, Clone, Deserialize)]
pub struct ConflictProbe {
    pub start_date: civil::Date,
    pub end_date: civil::Date,
    pub schedule_time: civil::Time,
    pub recurring_type: RecurringType,
    pub days_of_week: Option<Vec<u8>>,
    pub exclude_parent_id: Option<Uuid>,
}

impl ConflictProbe {
    pub fn validate_for_check(&self) -> AppResult<()> {
        validate_date_window(self.start_date, self.end_date)?;
        validate_recurrence(Some(self.recurring_type), self.days_of_week.as_deref())
    }
}

/// Partial update of an existing schedule. Absent fields keep their
/// current value; which present fields are honored depends on the
/// schedule's edit case.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulePatch {
    pub start_date: Option<civil::Date>,
    pub end_date: Option<civil::Date>,
    pub schedule_time: Option<civil::Time>,
    pub recipient_emails: Option<Vec<String>>,
    pub recurring_type: Option<RecurringType>,
    pub days_of_week: Option<Vec<u8>>,
}

impl SchedulePatch {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.schedule_time.is_none()
            && self.recipient_emails.is_none()
            && self.recurring_type.is_none()
            && self.days_of_week.is_none()
    }

    /// True when the patch can change which occurrence slots exist,
    /// which forces a conflict re-check and a re-expansion.
    pub fn reshapes_occurrences(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.schedule_time.is_some()
            || self.recurring_type.is_some()
            || self.days_of_week.is_some()
    }
}

pub(crate) fn validate_date_window(start: civil::Date, end: civil::Date) -> AppResult<()> {
    if end <= start {
        return Err(AppError::validation(
            "end_date",
            "End date must be after start date",
        ));
    }
    Ok(())
}

pub(crate) fn validate_recurrence(
    recurring_type: Option<RecurringType>,
    days_of_week: Option<&[u8]>,
) -> AppResult<()> {
    if recurring_type == Some(RecurringType::Weekly) {
        let days = days_of_week.unwrap_or_default();
        if days.is_empty() {
            return Err(AppError::validation(
                "days_of_week",
                "Days selection is required for weekly schedules",
            ));
        }
        validate_days(days)?;
    } else if let Some(days) = days_of_week {
        validate_days(days)?;
    }
    Ok(())
}

pub(crate) fn validate_days(days: &[u8]) -> AppResult<()> {
    if days.iter().any(|d| *d > 6) {
        return Err(AppError::validation(
            "days_of_week",
            "days must be integers between 0 (Sunday) and 6 (Saturday)",
        ));
    }
    let mut seen = [false; 7];
    for day in days {
        if std::mem::replace(&mut seen[*day as usize], true) {
            return Err(AppError::validation(
                "days_of_week",
                "days must not contain duplicates",
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_emails(emails: &[String]) -> AppResult<()> {
    for email in emails {
        if !email.validate_email() {
            return Err(AppError::validation(
                "recipient_emails",
                format!("'{}' is not a valid email address", email),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::{date, time};

    fn request() -> CreateScheduleRequest {
        CreateScheduleRequest {
            schedule_name: "weekly export".to_string(),
            file_reference: "acme/brand/platform/bulk_uploads/file.xlsx".to_string(),
            file_name: "file.xlsx".to_string(),
            recipient_emails: vec!["ops@example.com".to_string()],
            schedule_kind: ScheduleKind::Recurring,
            recurring_type: Some(RecurringType::Weekly),
            start_date: date(2025, 6, 2),
            end_date: date(2025, 6, 30),
            schedule_time: time(9, 0, 0, 0),
            days_of_week: Some(vec![1]),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate_for_create(date(2025, 6, 1)).is_ok());
    }

    #[test]
    fn past_start_date_is_rejected() {
        let err = request()
            .validate_for_create(date(2025, 6, 3))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "start_date"));
    }

    #[test]
    fn inverted_date_window_is_rejected() {
        let mut req = request();
        req.end_date = req.start_date;
        let err = req.validate_for_create(date(2025, 6, 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "end_date"));
    }

    #[test]
    fn weekly_without_days_is_rejected() {
        let mut req = request();
        req.days_of_week = None;
        let err = req.validate_for_create(date(2025, 6, 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "days_of_week"));
    }

    #[test]
    fn duplicate_days_are_rejected() {
        assert!(validate_days(&[1, 3, 1]).is_err());
        assert!(validate_days(&[0, 6]).is_ok());
        assert!(validate_days(&[7]).is_err());
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut req = request();
        req.recipient_emails = vec!["not-an-email".to_string()];
        let err = req.validate_for_create(date(2025, 6, 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "recipient_emails"));
    }

    #[test]
    fn short_name_fails_structural_validation() {
        let mut req = request();
        req.schedule_name = "ab".to_string();
        assert!(req.validate_for_create(date(2025, 6, 1)).is_err());
    }

    #[test]
    fn empty_patch_reshapes_nothing() {
        let patch = SchedulePatch::default();
        assert!(patch.is_empty());
        assert!(!patch.reshapes_occurrences());

        let emails_only = SchedulePatch {
            recipient_emails: Some(vec!["a@b.co".to_string()]),
            ..Default::default()
        };
        assert!(!emails_only.reshapes_occurrences());

        let time_change = SchedulePatch {
            schedule_time: Some(time(10, 0, 0, 0)),
            ..Default::default()
        };
        assert!(time_change.reshapes_occurrences());
    }
}
