use chrono::{NaiveDate, NaiveDateTime};
use roster_engine::{GeneratedSchedule, MemberId, Role};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::application::time::format_service;
use crate::domain::absence_model::RemovedAssignment;
use crate::domain::schedule_model::*;
use crate::error::{Result, RosterError};
use crate::infrastructure::finish;

pub struct ScheduleRepository {
    pool: SqlitePool,
}

const ASSIGNMENT_COLUMNS: &str = "SELECT a.id, a.member_id, m.name AS member_name, a.service_at, a.role, a.assigned_at
     FROM assignments a
     JOIN members m ON m.id = a.member_id";

#[derive(FromRow)]
struct SlotRow {
    id: i64,
    service_at: NaiveDateTime,
    role: String,
}

#[derive(FromRow)]
struct TotalsRow {
    total_assignments: i64,
    total_services: i64,
    distinct_members: i64,
    first_service: Option<NaiveDateTime>,
    last_service: Option<NaiveDateTime>,
}

fn decode_role(raw: &str) -> std::result::Result<Role, sqlx::Error> {
    raw.parse::<Role>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn into_assignments(rows: Vec<AssignmentRow>) -> Result<Vec<Assignment>> {
    rows.into_iter()
        .map(Assignment::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(RosterError::DataUnavailable)
}

// =====================
// Connection-level operations, shared with other repositories' transactions
// =====================

/// Services among `services` that already have at least one assignment.
pub(crate) async fn occupied_services(
    conn: &mut SqliteConnection,
    services: &[NaiveDateTime],
) -> sqlx::Result<Vec<NaiveDateTime>> {
    if services.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT DISTINCT service_at FROM assignments WHERE service_at IN (");
    let mut separated = qb.separated(", ");
    for service_at in services {
        separated.push_bind(*service_at);
    }
    separated.push_unseparated(") ORDER BY service_at ASC");

    qb.build_query_scalar::<NaiveDateTime>()
        .fetch_all(&mut *conn)
        .await
}

/// The member's assignments whose service date lies in `[start, end]`.
pub(crate) async fn assignments_in_range(
    conn: &mut SqliteConnection,
    member_id: MemberId,
    start: NaiveDate,
    end: NaiveDate,
) -> sqlx::Result<Vec<RemovedAssignment>> {
    let rows = sqlx::query_as::<_, SlotRow>(
        "SELECT id, service_at, role FROM assignments
         WHERE member_id = ?1 AND date(service_at) BETWEEN ?2 AND ?3
         ORDER BY service_at ASC, id ASC",
    )
    .bind(member_id)
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(RemovedAssignment {
                assignment_id: row.id,
                service_at: row.service_at,
                role: decode_role(&row.role)?,
            })
        })
        .collect()
}

pub(crate) async fn delete_assignments_in_range(
    conn: &mut SqliteConnection,
    member_id: MemberId,
    start: NaiveDate,
    end: NaiveDate,
) -> sqlx::Result<u64> {
    let done = sqlx::query(
        "DELETE FROM assignments WHERE member_id = ?1 AND date(service_at) BETWEEN ?2 AND ?3",
    )
    .bind(member_id)
    .bind(start)
    .bind(end)
    .execute(&mut *conn)
    .await?;
    Ok(done.rows_affected())
}

/// True if one of the member's absences covers `date`.
async fn is_absent_on(conn: &mut SqliteConnection, member_id: MemberId, date: NaiveDate) -> sqlx::Result<bool> {
    let hits: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM absences
         WHERE member_id = ?1 AND start_date <= ?2 AND end_date >= ?2",
    )
    .bind(member_id)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;
    Ok(hits > 0)
}

async fn insert_assignment(
    conn: &mut SqliteConnection,
    member_id: MemberId,
    service_at: NaiveDateTime,
    role: Role,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO assignments (member_id, service_at, role) VALUES (?1, ?2, ?3)")
        .bind(member_id)
        .bind(service_at)
        .bind(role.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_schedule_rows(conn: &mut SqliteConnection, schedule: &GeneratedSchedule) -> Result<u64> {
    // 1. re-check: time may have passed since generation
    let services: Vec<NaiveDateTime> = schedule.services.iter().map(|s| s.service_at).collect();
    let occupied = occupied_services(&mut *conn, &services)
        .await
        .map_err(RosterError::TransactionFailed)?;
    if !occupied.is_empty() {
        return Err(RosterError::ScheduleConflict { services: occupied });
    }

    // 2. absences recorded after generation win over the draft
    for roster in &schedule.services {
        for (member, _) in roster.assignments() {
            let absent = is_absent_on(&mut *conn, member.id, roster.service_at.date())
                .await
                .map_err(RosterError::TransactionFailed)?;
            if absent {
                return Err(RosterError::MemberAbsent {
                    member_id: member.id,
                    service_at: roster.service_at,
                });
            }
        }
    }

    // 3. one row per (service, role, member)
    let mut inserted = 0;
    for roster in &schedule.services {
        for (member, role) in roster.assignments() {
            insert_assignment(&mut *conn, member.id, roster.service_at, role)
                .await
                .map_err(RosterError::TransactionFailed)?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

async fn replace_service_rows(
    conn: &mut SqliteConnection,
    original: NaiveDateTime,
    replacement: NaiveDateTime,
    edit: &RosterEdit,
) -> Result<u64> {
    // 1. the original must exist
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assignments WHERE service_at = ?1")
        .bind(original)
        .fetch_one(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?;
    if existing == 0 {
        return Err(RosterError::NotFound(format!(
            "no schedule for {}",
            format_service(original)
        )));
    }

    // 2. moving onto an occupied service is a conflict
    if replacement != original {
        let occupied = occupied_services(&mut *conn, &[replacement])
            .await
            .map_err(RosterError::TransactionFailed)?;
        if !occupied.is_empty() {
            return Err(RosterError::ScheduleConflict { services: occupied });
        }
    }

    // 3. every referenced member must exist and be available
    for (member_id, _) in edit.assignments() {
        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE id = ?1")
            .bind(member_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(RosterError::TransactionFailed)?;
        if found == 0 {
            return Err(RosterError::NotFound(format!("member {member_id}")));
        }
        let absent = is_absent_on(&mut *conn, member_id, replacement.date())
            .await
            .map_err(RosterError::TransactionFailed)?;
        if absent {
            return Err(RosterError::MemberAbsent {
                member_id,
                service_at: replacement,
            });
        }
    }

    // 4. swap
    sqlx::query("DELETE FROM assignments WHERE service_at = ?1")
        .bind(original)
        .execute(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?;

    let mut inserted = 0;
    for (member_id, role) in edit.assignments() {
        insert_assignment(&mut *conn, member_id, replacement, role)
            .await
            .map_err(RosterError::TransactionFailed)?;
        inserted += 1;
    }
    Ok(inserted)
}

impl ScheduleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn existing_service_times(&self, services: &[NaiveDateTime]) -> Result<Vec<NaiveDateTime>> {
        let mut conn = self.pool.acquire().await.map_err(RosterError::DataUnavailable)?;
        occupied_services(&mut conn, services)
            .await
            .map_err(RosterError::DataUnavailable)
    }

    /// Persists a generated schedule in one transaction. Fails with
    /// `ScheduleConflict` if any of its services gained assignments meanwhile.
    pub async fn insert_schedule(&self, schedule: &GeneratedSchedule) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(RosterError::DataUnavailable)?;
        let outcome = insert_schedule_rows(&mut tx, schedule).await;
        let inserted = finish(tx, outcome).await?;

        info!(
            services = schedule.services.len(),
            assignments = inserted,
            "schedule confirmed"
        );
        Ok(inserted)
    }

    /// Newest service first.
    pub async fn list_saved(&self) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "{ASSIGNMENT_COLUMNS} ORDER BY a.service_at DESC, a.role ASC, m.name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;
        into_assignments(rows)
    }

    pub async fn service_roster(&self, service_at: NaiveDateTime) -> Result<Option<SavedService>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "{ASSIGNMENT_COLUMNS} WHERE a.service_at = ?1 ORDER BY a.role ASC, a.id ASC"
        ))
        .bind(service_at)
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(SavedService::from_assignments(
            service_at,
            into_assignments(rows)?,
        )))
    }

    pub async fn assignments_for_member(&self, member_id: MemberId) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "{ASSIGNMENT_COLUMNS} WHERE a.member_id = ?1 ORDER BY a.service_at DESC"
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;
        into_assignments(rows)
    }

    pub async fn assignments_in_range(
        &self,
        member_id: MemberId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RemovedAssignment>> {
        let mut conn = self.pool.acquire().await.map_err(RosterError::DataUnavailable)?;
        assignments_in_range(&mut conn, member_id, start, end)
            .await
            .map_err(RosterError::DataUnavailable)
    }

    pub async fn delete_service(&self, service_at: NaiveDateTime) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM assignments WHERE service_at = ?1")
            .bind(service_at)
            .execute(&self.pool)
            .await
            .map_err(RosterError::DataUnavailable)?
            .rows_affected();

        if removed == 0 {
            return Err(RosterError::NotFound(format!(
                "no schedule for {}",
                format_service(service_at)
            )));
        }
        info!(service_at = %service_at, removed, "service deleted");
        Ok(removed)
    }

    /// Atomically replaces the roster of `original`, optionally moving it to `replacement`.
    pub async fn replace_service(
        &self,
        original: NaiveDateTime,
        replacement: NaiveDateTime,
        edit: &RosterEdit,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(RosterError::DataUnavailable)?;
        let outcome = replace_service_rows(&mut tx, original, replacement, edit).await;
        let inserted = finish(tx, outcome).await?;

        info!(
            original = %original,
            replacement = %replacement,
            assignments = inserted,
            "service edited"
        );
        Ok(inserted)
    }

    pub async fn stats(&self) -> Result<ScheduleStats> {
        let totals = sqlx::query_as::<_, TotalsRow>(
            "SELECT
                COUNT(*) AS total_assignments,
                COUNT(DISTINCT service_at) AS total_services,
                COUNT(DISTINCT member_id) AS distinct_members,
                MIN(service_at) AS first_service,
                MAX(service_at) AS last_service
             FROM assignments",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        let per_role_rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT role, COUNT(*) FROM assignments GROUP BY role",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        let mut stats = ScheduleStats {
            total_assignments: totals.total_assignments,
            total_services: totals.total_services,
            distinct_members: totals.distinct_members,
            first_service: totals.first_service,
            last_service: totals.last_service,
            ..Default::default()
        };
        for (role, count) in per_role_rows {
            let role = decode_role(&role).map_err(RosterError::DataUnavailable)?;
            stats.per_role.insert(role, count);
        }
        Ok(stats)
    }
}
