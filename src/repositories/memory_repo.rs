//! In-memory schedule repository.
//!
//! Mirrors the Postgres implementation's semantics over plain maps so
//! the lifecycle service can be exercised without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::civil;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ChildOccurrence, ParentSchedule, ScheduleScope, ScheduleStatus};
use crate::repositories::{
    NewScheduleRecord, OccurrenceQuery, OccurrenceStats, ScheduleChanges, ScheduleRepository,
    StatusUpdateRecord,
};
use crate::scheduling::OccurrenceHit;

#[derive(Debug, Clone)]
struct StoredChild {
    child_id: Uuid,
    parent_id: Uuid,
    scope: ScheduleScope,
    schedule_name: String,
    occurrence_date: civil::Date,
    schedule_time: civil::Time,
    status: ScheduleStatus,
}

#[derive(Default)]
struct Store {
    parents: HashMap<Uuid, ParentSchedule>,
    children: Vec<StoredChild>,
}

#[derive(Default)]
pub struct MemoryScheduleRepository {
    store: RwLock<Store>,
}

impl MemoryScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn timestamp() -> civil::DateTime {
        jiff::Zoned::now().datetime()
    }
}

fn is_terminal(status: ScheduleStatus) -> bool {
    status.is_terminal()
}

fn apply_changes(parent: &mut ParentSchedule, changes: ScheduleChanges) {
    parent.start_date = changes.start_date;
    parent.end_date = changes.end_date;
    parent.schedule_time = changes.schedule_time;
    parent.recipient_emails = changes.recipient_emails;
    parent.recurring_type = changes.recurring_type;
    parent.days_of_week = changes.days_of_week;
    parent.updated_by = changes.updated_by;
    parent.updated_at = MemoryScheduleRepository::timestamp();
}

#[async_trait]
impl ScheduleRepository for MemoryScheduleRepository {
    async fn name_in_use(&self, scope: &ScheduleScope, name: &str) -> AppResult<bool> {
        let needle = name.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store.parents.values().any(|p| {
            p.scope == *scope
                && p.status != ScheduleStatus::Cancelled
                && p.schedule_name.trim().to_lowercase() == needle
        }))
    }

    async fn find_blocking_occurrences(
        &self,
        query: &OccurrenceQuery,
    ) -> AppResult<Vec<OccurrenceHit>> {
        let store = self.store.read().await;
        let mut hits: Vec<OccurrenceHit> = store
            .children
            .iter()
            .filter(|c| c.scope == query.scope)
            .filter(|c| {
                c.occurrence_date >= query.start_date && c.occurrence_date <= query.end_date
            })
            .filter(|c| c.schedule_time == query.schedule_time)
            .filter(|c| c.status.blocks_new_occurrences())
            .filter(|c| query.exclude_parent_id != Some(c.parent_id))
            .map(|c| OccurrenceHit {
                date: c.occurrence_date,
                schedule_name: c.schedule_name.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(hits)
    }

    async fn insert_parent_with_children(
        &self,
        record: NewScheduleRecord,
        dates: &[civil::Date],
    ) -> AppResult<ParentSchedule> {
        let mut store = self.store.write().await;

        // Matches the partial unique index on (scope, lower(name)).
        let needle = record.schedule_name.trim().to_lowercase();
        if store.parents.values().any(|p| {
            p.scope == record.scope
                && p.status != ScheduleStatus::Cancelled
                && p.schedule_name.trim().to_lowercase() == needle
        }) {
            return Err(AppError::DuplicateName {
                name: record.schedule_name,
            });
        }

        let now = Self::timestamp();
        let parent = ParentSchedule {
            parent_id: record.parent_id,
            scope: record.scope,
            schedule_name: record.schedule_name,
            file_reference: record.file_reference,
            file_name: record.file_name,
            recipient_emails: record.recipient_emails,
            schedule_kind: record.schedule_kind,
            recurring_type: record.recurring_type,
            start_date: record.start_date,
            end_date: record.end_date,
            schedule_time: record.schedule_time,
            days_of_week: record.days_of_week,
            status: record.status,
            created_by: record.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };

        for date in dates {
            store.children.push(StoredChild {
                child_id: Uuid::new_v4(),
                parent_id: parent.parent_id,
                scope: parent.scope,
                schedule_name: parent.schedule_name.clone(),
                occurrence_date: *date,
                schedule_time: parent.schedule_time,
                status: ScheduleStatus::Upcoming,
            });
        }
        store.parents.insert(parent.parent_id, parent.clone());

        Ok(parent)
    }

    async fn find_parent(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<Option<ParentSchedule>> {
        let store = self.store.read().await;
        Ok(store
            .parents
            .get(&parent_id)
            .filter(|p| p.scope == *scope)
            .cloned())
    }

    async fn update_parent(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        changes: ScheduleChanges,
    ) -> AppResult<ParentSchedule> {
        let mut store = self.store.write().await;

        let parent = store
            .parents
            .get_mut(&parent_id)
            .filter(|p| p.scope == *scope)
            .ok_or_else(|| AppError::NotFound {
                entity: "schedule".to_string(),
                field: "parent_id".to_string(),
                value: parent_id.to_string(),
            })?;

        apply_changes(parent, changes);
        Ok(parent.clone())
    }

    async fn update_parent_replace_future(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        changes: ScheduleChanges,
        dates: &[civil::Date],
        today: civil::Date,
    ) -> AppResult<ParentSchedule> {
        let mut store = self.store.write().await;

        let parent = store
            .parents
            .get_mut(&parent_id)
            .filter(|p| p.scope == *scope)
            .ok_or_else(|| AppError::NotFound {
                entity: "schedule".to_string(),
                field: "parent_id".to_string(),
                value: parent_id.to_string(),
            })?;

        apply_changes(parent, changes);
        let parent = parent.clone();

        store.children.retain(|c| {
            c.parent_id != parent_id || c.occurrence_date < today || is_terminal(c.status)
        });
        let occupied: Vec<civil::Date> = store
            .children
            .iter()
            .filter(|c| c.parent_id == parent_id)
            .map(|c| c.occurrence_date)
            .collect();

        for date in dates {
            if *date < today || occupied.contains(date) {
                continue;
            }
            store.children.push(StoredChild {
                child_id: Uuid::new_v4(),
                parent_id,
                scope: parent.scope,
                schedule_name: parent.schedule_name.clone(),
                occurrence_date: *date,
                schedule_time: parent.schedule_time,
                status: ScheduleStatus::Upcoming,
            });
        }

        Ok(parent)
    }

    async fn update_status_where_not_terminal(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        child_id: Option<Uuid>,
        status: ScheduleStatus,
        updated_by: Option<Uuid>,
    ) -> AppResult<Vec<StatusUpdateRecord>> {
        let mut store = self.store.write().await;
        let mut records = Vec::new();

        if let Some(child_id) = child_id {
            for child in store.children.iter_mut().filter(|c| {
                c.child_id == child_id
                    && c.parent_id == parent_id
                    && c.scope == *scope
                    && !is_terminal(c.status)
            }) {
                child.status = status;
                records.push(StatusUpdateRecord {
                    parent_id: child.parent_id,
                    child_id: Some(child.child_id),
                    occurrence_date: Some(child.occurrence_date),
                    status,
                });
            }
            return Ok(records);
        }

        if let Some(parent) = store
            .parents
            .get_mut(&parent_id)
            .filter(|p| p.scope == *scope && !is_terminal(p.status))
        {
            parent.status = status;
            parent.updated_by = updated_by;
            parent.updated_at = Self::timestamp();
            records.push(StatusUpdateRecord {
                parent_id,
                child_id: None,
                occurrence_date: None,
                status,
            });
        }
        for child in store
            .children
            .iter_mut()
            .filter(|c| c.parent_id == parent_id && c.scope == *scope && !is_terminal(c.status))
        {
            child.status = status;
            records.push(StatusUpdateRecord {
                parent_id: child.parent_id,
                child_id: Some(child.child_id),
                occurrence_date: Some(child.occurrence_date),
                status,
            });
        }

        Ok(records)
    }

    async fn children_of(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<Vec<ChildOccurrence>> {
        let store = self.store.read().await;
        let mut children: Vec<ChildOccurrence> = store
            .children
            .iter()
            .filter(|c| c.parent_id == parent_id && c.scope == *scope)
            .map(|c| ChildOccurrence {
                child_id: c.child_id,
                parent_id: c.parent_id,
                occurrence_date: c.occurrence_date,
                schedule_time: c.schedule_time,
                status: c.status,
            })
            .collect();
        children.sort_by(|a, b| a.occurrence_date.cmp(&b.occurrence_date));
        Ok(children)
    }

    async fn list_parents(
        &self,
        scope: &ScheduleScope,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<ParentSchedule>, i64)> {
        let store = self.store.read().await;
        let needle = search.map(str::to_lowercase);
        let mut parents: Vec<ParentSchedule> = store
            .parents
            .values()
            .filter(|p| p.scope == *scope)
            .filter(|p| match &needle {
                Some(n) => p.schedule_name.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        parents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = parents.len() as i64;
        let page = parents
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn occurrence_stats(
        &self,
        parent_ids: &[Uuid],
        today: civil::Date,
    ) -> AppResult<HashMap<Uuid, OccurrenceStats>> {
        let store = self.store.read().await;
        let mut stats: HashMap<Uuid, OccurrenceStats> = HashMap::new();

        for child in store
            .children
            .iter()
            .filter(|c| parent_ids.contains(&c.parent_id))
        {
            let entry = stats.entry(child.parent_id).or_default();
            match child.status {
                ScheduleStatus::Success => entry.completed += 1,
                ScheduleStatus::Failed => entry.failed += 1,
                s if s.blocks_new_occurrences() => entry.pending += 1,
                _ => {}
            }
            if child.status.blocks_new_occurrences() && child.occurrence_date >= today {
                entry.next_run_date = Some(match entry.next_run_date {
                    Some(current) => current.min(child.occurrence_date),
                    None => child.occurrence_date,
                });
            }
            if child.status.is_terminal() {
                entry.last_run_date = Some(match entry.last_run_date {
                    Some(current) => current.max(child.occurrence_date),
                    None => child.occurrence_date,
                });
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecurringType, ScheduleKind};

    fn scope() -> ScheduleScope {
        ScheduleScope {
            app_id: Uuid::new_v4(),
            brand_id: Uuid::new_v4(),
            platform_id: Uuid::new_v4(),
        }
    }

    fn record(scope: ScheduleScope, name: &str) -> NewScheduleRecord {
        NewScheduleRecord {
            parent_id: Uuid::new_v4(),
            scope,
            schedule_name: name.to_string(),
            file_reference: "s3://bucket/reports/input.csv".to_string(),
            file_name: "input.csv".to_string(),
            recipient_emails: vec!["ops@example.com".to_string()],
            schedule_kind: ScheduleKind::Recurring,
            recurring_type: Some(RecurringType::Daily),
            start_date: civil::date(2026, 9, 1),
            end_date: civil::date(2026, 9, 5),
            schedule_time: civil::time(9, 0, 0, 0),
            days_of_week: None,
            status: ScheduleStatus::Upcoming,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn insert_creates_one_child_per_date() {
        let repo = MemoryScheduleRepository::new();
        let scope = scope();
        let dates: Vec<_> = (1..=5).map(|d| civil::date(2026, 9, d)).collect();

        let parent = repo
            .insert_parent_with_children(record(scope, "daily report"), &dates)
            .await
            .unwrap();

        let children = repo.children_of(&scope, parent.parent_id).await.unwrap();
        assert_eq!(children.len(), 5);
        assert!(children.iter().all(|c| c.status == ScheduleStatus::Upcoming));
    }

    #[tokio::test]
    async fn name_check_is_case_insensitive_and_skips_cancelled() {
        let repo = MemoryScheduleRepository::new();
        let scope = scope();
        let parent = repo
            .insert_parent_with_children(record(scope, "Daily Report"), &[])
            .await
            .unwrap();

        assert!(repo.name_in_use(&scope, "  daily report ").await.unwrap());

        repo.update_status_where_not_terminal(
            &scope,
            parent.parent_id,
            None,
            ScheduleStatus::Cancelled,
            None,
        )
        .await
        .unwrap();
        assert!(!repo.name_in_use(&scope, "daily report").await.unwrap());
    }

    #[tokio::test]
    async fn blocking_probe_excludes_requested_parent() {
        let repo = MemoryScheduleRepository::new();
        let scope = scope();
        let dates = vec![civil::date(2026, 9, 1)];
        let parent = repo
            .insert_parent_with_children(record(scope, "daily report"), &dates)
            .await
            .unwrap();

        let mut query = OccurrenceQuery {
            scope,
            start_date: civil::date(2026, 9, 1),
            end_date: civil::date(2026, 9, 5),
            schedule_time: civil::time(9, 0, 0, 0),
            exclude_parent_id: None,
        };
        assert_eq!(repo.find_blocking_occurrences(&query).await.unwrap().len(), 1);

        query.exclude_parent_id = Some(parent.parent_id);
        assert!(repo.find_blocking_occurrences(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_update_skips_terminal_rows() {
        let repo = MemoryScheduleRepository::new();
        let scope = scope();
        let dates: Vec<_> = (1..=2).map(|d| civil::date(2026, 9, d)).collect();
        let parent = repo
            .insert_parent_with_children(record(scope, "daily report"), &dates)
            .await
            .unwrap();

        let children = repo.children_of(&scope, parent.parent_id).await.unwrap();
        repo.update_status_where_not_terminal(
            &scope,
            parent.parent_id,
            Some(children[0].child_id),
            ScheduleStatus::Success,
            None,
        )
        .await
        .unwrap();

        let touched = repo
            .update_status_where_not_terminal(
                &scope,
                parent.parent_id,
                None,
                ScheduleStatus::Paused,
                None,
            )
            .await
            .unwrap();
        // parent + one non-terminal child
        assert_eq!(touched.len(), 2);
    }
}
