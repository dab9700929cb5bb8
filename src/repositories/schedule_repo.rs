//! Postgres-backed schedule repository using diesel-async.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use jiff::civil;
use jiff_diesel::ToDiesel;
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    ChildOccurrence, ParentSchedule, RecurringType, ScheduleKind, ScheduleScope, ScheduleStatus,
};
use crate::repositories::{
    NewScheduleRecord, OccurrenceQuery, OccurrenceStats, ScheduleChanges, ScheduleRepository,
    StatusUpdateRecord,
};
use crate::scheduling::OccurrenceHit;
use crate::schema::{schedule_occurrences, schedule_parents};

diesel::define_sql_function! {
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schedule_parents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ParentRow {
    parent_id: Uuid,
    app_id: Uuid,
    brand_id: Uuid,
    platform_id: Uuid,
    schedule_name: String,
    file_reference: String,
    file_name: String,
    recipient_emails: Vec<String>,
    schedule_kind: ScheduleKind,
    recurring_type: Option<RecurringType>,
    start_date: jiff_diesel::Date,
    end_date: jiff_diesel::Date,
    schedule_time: jiff_diesel::Time,
    days_of_week: Option<Vec<i32>>,
    status: ScheduleStatus,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
    created_at: jiff_diesel::DateTime,
    updated_at: jiff_diesel::DateTime,
}

impl From<ParentRow> for ParentSchedule {
    fn from(row: ParentRow) -> Self {
        ParentSchedule {
            parent_id: row.parent_id,
            scope: ScheduleScope {
                app_id: row.app_id,
                brand_id: row.brand_id,
                platform_id: row.platform_id,
            },
            schedule_name: row.schedule_name,
            file_reference: row.file_reference,
            file_name: row.file_name,
            recipient_emails: row.recipient_emails,
            schedule_kind: row.schedule_kind,
            recurring_type: row.recurring_type,
            start_date: row.start_date.to_jiff(),
            end_date: row.end_date.to_jiff(),
            schedule_time: row.schedule_time.to_jiff(),
            days_of_week: row
                .days_of_week
                .map(|days| days.into_iter().map(|d| d as u8).collect()),
            status: row.status,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at.to_jiff(),
            updated_at: row.updated_at.to_jiff(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schedule_parents)]
struct NewParentRow {
    parent_id: Uuid,
    app_id: Uuid,
    brand_id: Uuid,
    platform_id: Uuid,
    schedule_name: String,
    file_reference: String,
    file_name: String,
    recipient_emails: Vec<String>,
    schedule_kind: ScheduleKind,
    recurring_type: Option<RecurringType>,
    start_date: jiff_diesel::Date,
    end_date: jiff_diesel::Date,
    schedule_time: jiff_diesel::Time,
    days_of_week: Option<Vec<i32>>,
    status: ScheduleStatus,
    created_by: Option<Uuid>,
}

impl From<NewScheduleRecord> for NewParentRow {
    fn from(record: NewScheduleRecord) -> Self {
        NewParentRow {
            parent_id: record.parent_id,
            app_id: record.scope.app_id,
            brand_id: record.scope.brand_id,
            platform_id: record.scope.platform_id,
            schedule_name: record.schedule_name,
            file_reference: record.file_reference,
            file_name: record.file_name,
            recipient_emails: record.recipient_emails,
            schedule_kind: record.schedule_kind,
            recurring_type: record.recurring_type,
            start_date: record.start_date.to_diesel(),
            end_date: record.end_date.to_diesel(),
            schedule_time: record.schedule_time.to_diesel(),
            days_of_week: record
                .days_of_week
                .map(|days| days.into_iter().map(i32::from).collect()),
            status: record.status,
            created_by: record.created_by,
        }
    }
}

/// Merged values written by an update. None means SQL NULL here, not
/// "leave unchanged": the service always supplies effective values.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = schedule_parents)]
#[diesel(treat_none_as_null = true)]
struct ParentChangeset {
    start_date: jiff_diesel::Date,
    end_date: jiff_diesel::Date,
    schedule_time: jiff_diesel::Time,
    recipient_emails: Vec<String>,
    recurring_type: Option<RecurringType>,
    days_of_week: Option<Vec<i32>>,
    updated_by: Option<Uuid>,
}

impl From<ScheduleChanges> for ParentChangeset {
    fn from(changes: ScheduleChanges) -> Self {
        ParentChangeset {
            start_date: changes.start_date.to_diesel(),
            end_date: changes.end_date.to_diesel(),
            schedule_time: changes.schedule_time.to_diesel(),
            recipient_emails: changes.recipient_emails,
            recurring_type: changes.recurring_type,
            days_of_week: changes
                .days_of_week
                .map(|days| days.into_iter().map(i32::from).collect()),
            updated_by: changes.updated_by,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schedule_occurrences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ChildRow {
    child_id: Uuid,
    parent_id: Uuid,
    #[allow(dead_code)]
    app_id: Uuid,
    #[allow(dead_code)]
    brand_id: Uuid,
    #[allow(dead_code)]
    platform_id: Uuid,
    #[allow(dead_code)]
    schedule_name: String,
    occurrence_date: jiff_diesel::Date,
    schedule_time: jiff_diesel::Time,
    status: ScheduleStatus,
    #[allow(dead_code)]
    updated_by: Option<Uuid>,
    #[allow(dead_code)]
    created_at: jiff_diesel::DateTime,
    #[allow(dead_code)]
    updated_at: jiff_diesel::DateTime,
}

impl From<ChildRow> for ChildOccurrence {
    fn from(row: ChildRow) -> Self {
        ChildOccurrence {
            child_id: row.child_id,
            parent_id: row.parent_id,
            occurrence_date: row.occurrence_date.to_jiff(),
            schedule_time: row.schedule_time.to_jiff(),
            status: row.status,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schedule_occurrences)]
struct NewChildRow {
    child_id: Uuid,
    parent_id: Uuid,
    app_id: Uuid,
    brand_id: Uuid,
    platform_id: Uuid,
    schedule_name: String,
    occurrence_date: jiff_diesel::Date,
    schedule_time: jiff_diesel::Time,
    status: ScheduleStatus,
}

fn child_rows(
    parent_id: Uuid,
    scope: &ScheduleScope,
    schedule_name: &str,
    schedule_time: civil::Time,
    dates: impl IntoIterator<Item = civil::Date>,
) -> Vec<NewChildRow> {
    dates
        .into_iter()
        .map(|date| NewChildRow {
            child_id: Uuid::new_v4(),
            parent_id,
            app_id: scope.app_id,
            brand_id: scope.brand_id,
            platform_id: scope.platform_id,
            schedule_name: schedule_name.to_string(),
            occurrence_date: date.to_diesel(),
            schedule_time: schedule_time.to_diesel(),
            status: ScheduleStatus::Upcoming,
        })
        .collect()
}

#[derive(Clone)]
pub struct PgScheduleRepository {
    pool: AsyncDbPool,
}

impl PgScheduleRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> AppResult<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>,
    > {
        self.pool.get().await.map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
    }
}

#[async_trait]
impl ScheduleRepository for PgScheduleRepository {
    async fn name_in_use(&self, scope: &ScheduleScope, name: &str) -> AppResult<bool> {
        let mut conn = self.conn().await?;
        let needle = name.trim().to_lowercase();

        let found: Option<Uuid> = schedule_parents::table
            .filter(schedule_parents::app_id.eq(scope.app_id))
            .filter(schedule_parents::brand_id.eq(scope.brand_id))
            .filter(schedule_parents::platform_id.eq(scope.platform_id))
            .filter(schedule_parents::status.ne(ScheduleStatus::Cancelled))
            .filter(lower(schedule_parents::schedule_name).eq(needle))
            .select(schedule_parents::parent_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)?;

        Ok(found.is_some())
    }

    async fn find_blocking_occurrences(
        &self,
        query: &OccurrenceQuery,
    ) -> AppResult<Vec<OccurrenceHit>> {
        let mut conn = self.conn().await?;

        let mut stmt = schedule_occurrences::table
            .select((
                schedule_occurrences::occurrence_date,
                schedule_occurrences::schedule_name,
            ))
            .filter(schedule_occurrences::app_id.eq(query.scope.app_id))
            .filter(schedule_occurrences::brand_id.eq(query.scope.brand_id))
            .filter(schedule_occurrences::platform_id.eq(query.scope.platform_id))
            .filter(schedule_occurrences::occurrence_date.between(
                query.start_date.to_diesel(),
                query.end_date.to_diesel(),
            ))
            .filter(schedule_occurrences::schedule_time.eq(query.schedule_time.to_diesel()))
            .filter(schedule_occurrences::status.eq_any(vec![
                ScheduleStatus::Active,
                ScheduleStatus::Upcoming,
            ]))
            .into_boxed();

        if let Some(excluded) = query.exclude_parent_id {
            stmt = stmt.filter(schedule_occurrences::parent_id.ne(excluded));
        }

        let rows: Vec<(jiff_diesel::Date, String)> = stmt
            .order(schedule_occurrences::occurrence_date.asc())
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|(date, schedule_name)| OccurrenceHit {
                date: date.to_jiff(),
                schedule_name,
            })
            .collect())
    }

    async fn insert_parent_with_children(
        &self,
        record: NewScheduleRecord,
        dates: &[civil::Date],
    ) -> AppResult<ParentSchedule> {
        let mut conn = self.conn().await?;
        let children = child_rows(
            record.parent_id,
            &record.scope,
            &record.schedule_name,
            record.schedule_time,
            dates.iter().copied(),
        );
        let parent_row = NewParentRow::from(record);

        let inserted: ParentRow = conn
            .transaction::<_, AppError, _>(|conn| {
                async move {
                    let parent: ParentRow = diesel::insert_into(schedule_parents::table)
                        .values(&parent_row)
                        .get_result(conn)
                        .await
                        .map_err(AppError::from)?;

                    diesel::insert_into(schedule_occurrences::table)
                        .values(&children)
                        .execute(conn)
                        .await
                        .map_err(AppError::from)?;

                    Ok(parent)
                }
                .scope_boxed()
            })
            .await?;

        Ok(inserted.into())
    }

    async fn find_parent(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<Option<ParentSchedule>> {
        let mut conn = self.conn().await?;

        let row: Option<ParentRow> = schedule_parents::table
            .filter(schedule_parents::parent_id.eq(parent_id))
            .filter(schedule_parents::app_id.eq(scope.app_id))
            .filter(schedule_parents::brand_id.eq(scope.brand_id))
            .filter(schedule_parents::platform_id.eq(scope.platform_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)?;

        Ok(row.map(ParentSchedule::from))
    }

    async fn update_parent(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        changes: ScheduleChanges,
    ) -> AppResult<ParentSchedule> {
        let mut conn = self.conn().await?;
        let changeset = ParentChangeset::from(changes);

        let updated: ParentRow = diesel::update(
            schedule_parents::table
                .filter(schedule_parents::parent_id.eq(parent_id))
                .filter(schedule_parents::app_id.eq(scope.app_id))
                .filter(schedule_parents::brand_id.eq(scope.brand_id))
                .filter(schedule_parents::platform_id.eq(scope.platform_id)),
        )
        .set((
            &changeset,
            schedule_parents::updated_at.eq(diesel::dsl::now),
        ))
        .get_result(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => AppError::NotFound {
                entity: "schedule".to_string(),
                field: "parent_id".to_string(),
                value: parent_id.to_string(),
            },
            other => AppError::from(other),
        })?;

        Ok(updated.into())
    }

    async fn update_parent_replace_future(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        changes: ScheduleChanges,
        dates: &[civil::Date],
        today: civil::Date,
    ) -> AppResult<ParentSchedule> {
        let mut conn = self.conn().await?;
        let scope = *scope;
        let new_time = changes.schedule_time;
        let changeset = ParentChangeset::from(changes);
        let dates = dates.to_vec();

        let updated: ParentRow = conn
            .transaction::<_, AppError, _>(|conn| {
                async move {
                    let parent: ParentRow = diesel::update(
                        schedule_parents::table
                            .filter(schedule_parents::parent_id.eq(parent_id))
                            .filter(schedule_parents::app_id.eq(scope.app_id))
                            .filter(schedule_parents::brand_id.eq(scope.brand_id))
                            .filter(schedule_parents::platform_id.eq(scope.platform_id)),
                    )
                    .set((
                        &changeset,
                        schedule_parents::updated_at.eq(diesel::dsl::now),
                    ))
                    .get_result(conn)
                    .await
                    .map_err(|e| match e {
                        diesel::result::Error::NotFound => AppError::NotFound {
                            entity: "schedule".to_string(),
                            field: "parent_id".to_string(),
                            value: parent_id.to_string(),
                        },
                        other => AppError::from(other),
                    })?;

                    // Future rows that have not run yet are replaced by the
                    // re-expansion; past and terminal rows stay untouched.
                    diesel::delete(
                        schedule_occurrences::table
                            .filter(schedule_occurrences::parent_id.eq(parent_id))
                            .filter(schedule_occurrences::occurrence_date.ge(today.to_diesel()))
                            .filter(schedule_occurrences::status.ne_all(vec![
                                ScheduleStatus::Success,
                                ScheduleStatus::Failed,
                            ])),
                    )
                    .execute(conn)
                    .await
                    .map_err(AppError::from)?;

                    let occupied: Vec<jiff_diesel::Date> = schedule_occurrences::table
                        .filter(schedule_occurrences::parent_id.eq(parent_id))
                        .select(schedule_occurrences::occurrence_date)
                        .load(conn)
                        .await
                        .map_err(AppError::from)?;
                    let occupied: HashSet<civil::Date> =
                        occupied.into_iter().map(|d| d.to_jiff()).collect();

                    let fresh = child_rows(
                        parent_id,
                        &scope,
                        &parent.schedule_name,
                        new_time,
                        dates
                            .iter()
                            .copied()
                            .filter(|d| *d >= today && !occupied.contains(d)),
                    );
                    if !fresh.is_empty() {
                        diesel::insert_into(schedule_occurrences::table)
                            .values(&fresh)
                            .execute(conn)
                            .await
                            .map_err(AppError::from)?;
                    }

                    Ok(parent)
                }
                .scope_boxed()
            })
            .await?;

        Ok(updated.into())
    }

    async fn update_status_where_not_terminal(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
        child_id: Option<Uuid>,
        status: ScheduleStatus,
        updated_by: Option<Uuid>,
    ) -> AppResult<Vec<StatusUpdateRecord>> {
        let mut conn = self.conn().await?;
        let scope = *scope;

        let records = conn
            .transaction::<_, AppError, _>(|conn| {
                async move {
                    let mut records = Vec::new();

                    if let Some(child_id) = child_id {
                        let rows: Vec<ChildRow> = diesel::update(
                            schedule_occurrences::table
                                .filter(schedule_occurrences::child_id.eq(child_id))
                                .filter(schedule_occurrences::parent_id.eq(parent_id))
                                .filter(schedule_occurrences::app_id.eq(scope.app_id))
                                .filter(schedule_occurrences::brand_id.eq(scope.brand_id))
                                .filter(schedule_occurrences::platform_id.eq(scope.platform_id))
                                .filter(schedule_occurrences::status.ne_all(vec![
                                    ScheduleStatus::Success,
                                    ScheduleStatus::Failed,
                                ])),
                        )
                        .set((
                            schedule_occurrences::status.eq(status),
                            schedule_occurrences::updated_by.eq(updated_by),
                            schedule_occurrences::updated_at.eq(diesel::dsl::now),
                        ))
                        .get_results(conn)
                        .await
                        .map_err(AppError::from)?;

                        records.extend(rows.into_iter().map(|row| StatusUpdateRecord {
                            parent_id: row.parent_id,
                            child_id: Some(row.child_id),
                            occurrence_date: Some(row.occurrence_date.to_jiff()),
                            status: row.status,
                        }));
                    } else {
                        let parents: Vec<ParentRow> = diesel::update(
                            schedule_parents::table
                                .filter(schedule_parents::parent_id.eq(parent_id))
                                .filter(schedule_parents::app_id.eq(scope.app_id))
                                .filter(schedule_parents::brand_id.eq(scope.brand_id))
                                .filter(schedule_parents::platform_id.eq(scope.platform_id))
                                .filter(schedule_parents::status.ne_all(vec![
                                    ScheduleStatus::Success,
                                    ScheduleStatus::Failed,
                                ])),
                        )
                        .set((
                            schedule_parents::status.eq(status),
                            schedule_parents::updated_by.eq(updated_by),
                            schedule_parents::updated_at.eq(diesel::dsl::now),
                        ))
                        .get_results(conn)
                        .await
                        .map_err(AppError::from)?;

                        records.extend(parents.into_iter().map(|row| StatusUpdateRecord {
                            parent_id: row.parent_id,
                            child_id: None,
                            occurrence_date: None,
                            status: row.status,
                        }));

                        let children: Vec<ChildRow> = diesel::update(
                            schedule_occurrences::table
                                .filter(schedule_occurrences::parent_id.eq(parent_id))
                                .filter(schedule_occurrences::app_id.eq(scope.app_id))
                                .filter(schedule_occurrences::brand_id.eq(scope.brand_id))
                                .filter(schedule_occurrences::platform_id.eq(scope.platform_id))
                                .filter(schedule_occurrences::status.ne_all(vec![
                                    ScheduleStatus::Success,
                                    ScheduleStatus::Failed,
                                ])),
                        )
                        .set((
                            schedule_occurrences::status.eq(status),
                            schedule_occurrences::updated_by.eq(updated_by),
                            schedule_occurrences::updated_at.eq(diesel::dsl::now),
                        ))
                        .get_results(conn)
                        .await
                        .map_err(AppError::from)?;

                        records.extend(children.into_iter().map(|row| StatusUpdateRecord {
                            parent_id: row.parent_id,
                            child_id: Some(row.child_id),
                            occurrence_date: Some(row.occurrence_date.to_jiff()),
                            status: row.status,
                        }));
                    }

                    Ok(records)
                }
                .scope_boxed()
            })
            .await?;

        Ok(records)
    }

    async fn children_of(
        &self,
        scope: &ScheduleScope,
        parent_id: Uuid,
    ) -> AppResult<Vec<ChildOccurrence>> {
        let mut conn = self.conn().await?;

        let rows: Vec<ChildRow> = schedule_occurrences::table
            .filter(schedule_occurrences::parent_id.eq(parent_id))
            .filter(schedule_occurrences::app_id.eq(scope.app_id))
            .filter(schedule_occurrences::brand_id.eq(scope.brand_id))
            .filter(schedule_occurrences::platform_id.eq(scope.platform_id))
            .order(schedule_occurrences::occurrence_date.asc())
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(rows.into_iter().map(ChildOccurrence::from).collect())
    }

    async fn list_parents(
        &self,
        scope: &ScheduleScope,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<ParentSchedule>, i64)> {
        let mut conn = self.conn().await?;

        let pattern = search.map(|term| format!("%{}%", term));

        let mut stmt = schedule_parents::table
            .filter(schedule_parents::app_id.eq(scope.app_id))
            .filter(schedule_parents::brand_id.eq(scope.brand_id))
            .filter(schedule_parents::platform_id.eq(scope.platform_id))
            .into_boxed();
        let mut count_stmt = schedule_parents::table
            .filter(schedule_parents::app_id.eq(scope.app_id))
            .filter(schedule_parents::brand_id.eq(scope.brand_id))
            .filter(schedule_parents::platform_id.eq(scope.platform_id))
            .count()
            .into_boxed();

        if let Some(pattern) = pattern {
            stmt = stmt.filter(schedule_parents::schedule_name.ilike(pattern.clone()));
            count_stmt = count_stmt.filter(schedule_parents::schedule_name.ilike(pattern));
        }

        let total: i64 = count_stmt.get_result(&mut conn).await.map_err(AppError::from)?;

        let rows: Vec<ParentRow> = stmt
            .order(schedule_parents::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok((rows.into_iter().map(ParentSchedule::from).collect(), total))
    }

    async fn occurrence_stats(
        &self,
        parent_ids: &[Uuid],
        today: civil::Date,
    ) -> AppResult<HashMap<Uuid, OccurrenceStats>> {
        if parent_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn().await?;

        let rows: Vec<(Uuid, jiff_diesel::Date, ScheduleStatus)> = schedule_occurrences::table
            .filter(schedule_occurrences::parent_id.eq_any(parent_ids.to_vec()))
            .select((
                schedule_occurrences::parent_id,
                schedule_occurrences::occurrence_date,
                schedule_occurrences::status,
            ))
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        let mut stats: HashMap<Uuid, OccurrenceStats> = HashMap::new();
        for (parent_id, date, status) in rows {
            let date = date.to_jiff();
            let entry = stats.entry(parent_id).or_default();
            match status {
                ScheduleStatus::Success => entry.completed += 1,
                ScheduleStatus::Failed => entry.failed += 1,
                s if s.blocks_new_occurrences() => entry.pending += 1,
                _ => {}
            }
            if status.blocks_new_occurrences() && date >= today {
                entry.next_run_date = Some(match entry.next_run_date {
                    Some(current) => current.min(date),
                    None => date,
                });
            }
            if status.is_terminal() {
                entry.last_run_date = Some(match entry.last_run_date {
                    Some(current) => current.max(date),
                    None => date,
                });
            }
        }

        Ok(stats)
    }
}
