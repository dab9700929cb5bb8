//! Schedule lifecycle service.
//!
//! Owns the create / update / status-change flows and the invariants
//! tying them together: unique names per scope, conflict-free slots,
//! edit-case mutation rules and the one-hour lead-time guard. All
//! validation and conflict evaluation happens on pure in-process data;
//! the repository only narrows candidate rows.

use std::sync::Arc;

use dashmap::DashMap;
use jiff::civil;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ConflictProbe, CreateScheduleRequest, ParentSchedule, RecurringType, ScheduleDetails,
    ScheduleKind, ScheduleList, SchedulePatch, ScheduleScope, ScheduleStatus, ScheduleSummary,
    StatusAction, validate_date_window, validate_emails, validate_recurrence,
};
use crate::repositories::{
    NewScheduleRecord, OccurrenceQuery, ScheduleChanges, ScheduleRepository, StatusUpdateRecord,
};
use crate::scheduling::{self, ConflictReport, EditCase};
use crate::storage::{self, DownloadHandle, FileStore, UploadTarget};

/// Schedule lifecycle service.
///
/// Cheap to clone; per-scope mutexes serialize the check-then-insert
/// sections so two concurrent creates in one scope cannot both pass
/// the conflict check.
#[derive(Clone)]
pub struct ScheduleService {
    repo: Arc<dyn ScheduleRepository>,
    files: Option<Arc<dyn FileStore>>,
    scope_locks: Arc<DashMap<ScheduleScope, Arc<Mutex<()>>>>,
}

impl ScheduleService {
    pub fn new(repo: Arc<dyn ScheduleRepository>) -> Self {
        Self {
            repo,
            files: None,
            scope_locks: Arc::new(DashMap::new()),
        }
    }

    /// Attaches a file store; with one attached, creation verifies the
    /// referenced input file exists and presign endpoints are served.
    pub fn with_file_store(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    fn scope_lock(&self, scope: &ScheduleScope) -> Arc<Mutex<()>> {
        self.scope_locks
            .entry(*scope)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Evaluates a proposed slot against existing occupied occurrences.
    ///
    /// Weekly proposals only collide on matching weekdays; the report
    /// is empty (`has_conflict == false`) when the slot is free.
    pub async fn check_conflicts(
        &self,
        scope: &ScheduleScope,
        probe: &ConflictProbe,
    ) -> AppResult<ConflictReport> {
        probe.validate_for_check()?;
        let hits = self
            .repo
            .find_blocking_occurrences(&OccurrenceQuery {
                scope: *scope,
                start_date: probe.start_date,
                end_date: probe.end_date,
                schedule_time: probe.schedule_time,
                exclude_parent_id: probe.exclude_parent_id,
            })
            .await?;
        Ok(scheduling::conflict::evaluate(
            hits,
            probe.recurring_type,
            probe.days_of_week.as_deref(),
        ))
    }

    /// Creates a parent schedule and its expanded children atomically.
    pub async fn create(
        &self,
        scope: &ScheduleScope,
        request: CreateScheduleRequest,
        actor: Option<Uuid>,
        now: civil::DateTime,
    ) -> AppResult<ScheduleDetails> {
        let today = now.date();
        request.validate_for_create(today)?;

        if let Some(files) = &self.files {
            if !files.exists(&request.file_reference).await? {
                return Err(AppError::validation(
                    "file_reference",
                    "Referenced file has not been uploaded",
                ));
            }
        }

        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        if self.repo.name_in_use(scope, &request.schedule_name).await? {
            return Err(AppError::DuplicateName {
                name: request.schedule_name,
            });
        }

        let effective_recurrence = request.recurring_type.unwrap_or(RecurringType::Daily);
        let report = self
            .check_conflicts(
                scope,
                &ConflictProbe {
                    start_date: request.start_date,
                    end_date: request.end_date,
                    schedule_time: request.schedule_time,
                    recurring_type: effective_recurrence,
                    days_of_week: request.days_of_week.clone(),
                    exclude_parent_id: None,
                },
            )
            .await?;
        if report.has_conflict {
            return Err(AppError::Conflict {
                conflicts: report.conflicts,
            });
        }

        let dates = scheduling::recurrence::expand(
            request.start_date,
            request.end_date,
            request.recurring_type,
            request.days_of_week.as_deref(),
        );
        if dates.is_empty() {
            return Err(AppError::validation(
                "days_of_week",
                "Selected days produce no occurrences inside the date window",
            ));
        }

        let status = if request.start_date <= today {
            ScheduleStatus::Active
        } else {
            ScheduleStatus::Upcoming
        };
        let record = NewScheduleRecord {
            parent_id: Uuid::new_v4(),
            scope: *scope,
            schedule_name: request.schedule_name.trim().to_string(),
            file_reference: request.file_reference,
            file_name: request.file_name,
            recipient_emails: request.recipient_emails,
            schedule_kind: request.schedule_kind,
            recurring_type: match request.schedule_kind {
                ScheduleKind::OneTime => None,
                ScheduleKind::Recurring => request.recurring_type,
            },
            start_date: request.start_date,
            end_date: request.end_date,
            schedule_time: request.schedule_time,
            days_of_week: request.days_of_week,
            status,
            created_by: actor,
        };

        let parent = self.repo.insert_parent_with_children(record, &dates).await?;
        tracing::info!(
            parent_id = %parent.parent_id,
            occurrences = dates.len(),
            "Schedule created"
        );

        let children = self.repo.children_of(scope, parent.parent_id).await?;
        Ok(ScheduleDetails::new(parent, children))
    }

    /// Applies a status action to a parent (and all its non-terminal
    /// children) or, with `child_id`, to a single occurrence.
    pub async fn update_status(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        child_id: Option<Uuid>,
        action: StatusAction,
        actor: Option<Uuid>,
    ) -> AppResult<Vec<StatusUpdateRecord>> {
        let updated = self
            .repo
            .update_status_where_not_terminal(scope, parent_id, child_id, action.target_status(), actor)
            .await?;

        if updated.is_empty() {
            return Err(AppError::NotFoundOrImmutable {
                entity: "schedule".to_string(),
            });
        }
        tracing::info!(
            %parent_id,
            action = %action,
            rows = updated.len(),
            "Schedule status updated"
        );
        Ok(updated)
    }

    /// Edits a schedule under the edit-state rules, re-expanding future
    /// occurrences when the patch changes the slot shape.
    pub async fn update(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        patch: SchedulePatch,
        actor: Option<Uuid>,
        now: civil::DateTime,
    ) -> AppResult<(EditCase, ParentSchedule)> {
        if patch.is_empty() {
            return Err(AppError::validation("patch", "No fields to update"));
        }

        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let current = self
            .repo
            .find_parent(scope, parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "schedule".to_string(),
                field: "parent_id".to_string(),
                value: parent_id.to_string(),
            })?;
        if current.status == ScheduleStatus::Cancelled || current.status.is_terminal() {
            return Err(AppError::NotFoundOrImmutable {
                entity: "schedule".to_string(),
            });
        }

        let today = now.date();
        let case = scheduling::edit_state::classify(today, current.start_date, current.end_date);
        scheduling::edit_state::ensure_patch_allowed(case, &current, &patch)?;

        // Merge the patch over current values before revalidating.
        let start_date = patch.start_date.unwrap_or(current.start_date);
        let end_date = patch.end_date.unwrap_or(current.end_date);
        let schedule_time = patch.schedule_time.unwrap_or(current.schedule_time);
        let recipient_emails = patch
            .recipient_emails
            .clone()
            .unwrap_or_else(|| current.recipient_emails.clone());
        let recurring_type = patch.recurring_type.or(current.recurring_type);
        let days_of_week = patch
            .days_of_week
            .clone()
            .or_else(|| current.days_of_week.clone());

        validate_date_window(start_date, end_date)?;
        validate_recurrence(recurring_type, days_of_week.as_deref())?;
        validate_emails(&recipient_emails)?;
        if recipient_emails.is_empty() {
            return Err(AppError::validation(
                "recipient_emails",
                "At least one recipient email is required",
            ));
        }
        // Upcoming edits re-satisfy the creation invariants.
        if case == EditCase::Upcoming && start_date < today {
            return Err(AppError::validation(
                "start_date",
                "Start date cannot be in the past",
            ));
        }

        if patch
            .schedule_time
            .is_some_and(|t| t != current.schedule_time)
        {
            scheduling::edit_state::ensure_lead_time(now, schedule_time, start_date, end_date)?;
        }

        let changes = ScheduleChanges {
            start_date,
            end_date,
            schedule_time,
            recipient_emails,
            recurring_type,
            days_of_week,
            updated_by: actor,
        };

        // Only a patch that can change which slots exist forces the
        // conflict re-check and child regeneration; anything else leaves
        // the existing children (and their statuses) alone.
        let updated = if patch.reshapes_occurrences() {
            let report = self
                .check_conflicts(
                    scope,
                    &ConflictProbe {
                        start_date,
                        end_date,
                        schedule_time,
                        recurring_type: recurring_type.unwrap_or(RecurringType::Daily),
                        days_of_week: changes.days_of_week.clone(),
                        exclude_parent_id: Some(parent_id),
                    },
                )
                .await?;
            if report.has_conflict {
                return Err(AppError::Conflict {
                    conflicts: report.conflicts,
                });
            }

            let dates = scheduling::recurrence::expand(
                start_date,
                end_date,
                recurring_type,
                changes.days_of_week.as_deref(),
            );
            if dates.is_empty() {
                return Err(AppError::validation(
                    "days_of_week",
                    "Selected days produce no occurrences inside the date window",
                ));
            }

            self.repo
                .update_parent_replace_future(scope, parent_id, changes, &dates, today)
                .await?
        } else {
            self.repo.update_parent(scope, parent_id, changes).await?
        };
        tracing::info!(%parent_id, edit_case = %case, "Schedule updated");

        Ok((case, updated))
    }

    /// Whether `name` is free within the scope (cancelled schedules do
    /// not reserve their name).
    pub async fn validate_schedule_name(
        &self,
        scope: &ScheduleScope,
        name: &str,
    ) -> AppResult<bool> {
        let trimmed = name.trim();
        if trimmed.len() < 3 || trimmed.len() > 100 {
            return Err(AppError::validation(
                "schedule_name",
                "Schedule name must be between 3 and 100 characters",
            ));
        }
        Ok(!self.repo.name_in_use(scope, trimmed).await?)
    }

    /// A parent with all of its occurrences and status tallies.
    pub async fn schedule_details(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<ScheduleDetails> {
        let parent = self
            .repo
            .find_parent(scope, parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "schedule".to_string(),
                field: "parent_id".to_string(),
                value: parent_id.to_string(),
            })?;
        let children = self.repo.children_of(scope, parent_id).await?;
        Ok(ScheduleDetails::new(parent, children))
    }

    /// One page of schedules in scope, newest first, with run stats.
    pub async fn list_schedules(
        &self,
        scope: &ScheduleScope,
        search: Option<&str>,
        page: u32,
        per_page: u32,
        today: civil::Date,
    ) -> AppResult<ScheduleList> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let (parents, total) = self
            .repo
            .list_parents(scope, search, i64::from(per_page), offset)
            .await?;

        let ids: Vec<Uuid> = parents.iter().map(|p| p.parent_id).collect();
        let mut stats = self.repo.occurrence_stats(&ids, today).await?;

        let schedules = parents
            .into_iter()
            .map(|parent| {
                let s = stats.remove(&parent.parent_id).unwrap_or_default();
                ScheduleSummary {
                    parent,
                    completed_count: s.completed,
                    pending_count: s.pending,
                    failed_count: s.failed,
                    next_run_date: s.next_run_date,
                    last_run_date: s.last_run_date,
                }
            })
            .collect();

        Ok(ScheduleList {
            schedules,
            total,
            page,
            per_page,
        })
    }

    /// Presigns an upload slot for a new input file.
    pub async fn upload_target(
        &self,
        scope: &ScheduleScope,
        file_name: &str,
        now: jiff::Timestamp,
    ) -> AppResult<UploadTarget> {
        let files = self.file_store()?;
        if file_name.trim().is_empty() {
            return Err(AppError::validation("file_name", "file_name is required"));
        }
        let key = storage::upload_key(scope, file_name, now);
        files.presigned_put_url(&key).await
    }

    /// Presigns a download link for a stored file.
    pub async fn download_handle(&self, key: &str) -> AppResult<DownloadHandle> {
        let files = self.file_store()?;
        if !files.exists(key).await? {
            return Err(AppError::NotFound {
                entity: "file".to_string(),
                field: "key".to_string(),
                value: key.to_string(),
            });
        }
        files.presigned_get_url(key).await
    }

    fn file_store(&self) -> AppResult<&Arc<dyn FileStore>> {
        self.files.as_ref().ok_or_else(|| AppError::Internal {
            source: anyhow::anyhow!("no file store configured"),
        })
    }
}
