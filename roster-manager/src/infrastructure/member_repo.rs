use chrono::{NaiveDate, NaiveDateTime};
use roster_engine::{join_role_list, parse_role_list, MemberId};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::domain::member_model::*;
use crate::error::{Result, RosterError};
use crate::infrastructure::finish;

pub struct MemberRepository {
    pool: SqlitePool,
}

// =====================
// Row helpers
// =====================

#[derive(FromRow)]
struct MemberStatsRow {
    id: i64,
    name: String,
    roles: String,
    total_assignments: i64,
    recent_assignments: i64,
    last_service_at: Option<NaiveDateTime>,
}

fn name_taken(err: sqlx::Error, name: &str) -> RosterError {
    let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique {
        RosterError::Conflict(format!("a member named {name:?} already exists"))
    } else {
        RosterError::DataUnavailable(err)
    }
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, draft: &MemberDraft) -> Result<MemberRecord> {
        let id = sqlx::query("INSERT INTO members (name, roles) VALUES (?1, ?2)")
            .bind(&draft.name)
            .bind(join_role_list(&draft.roles))
            .execute(&self.pool)
            .await
            .map_err(|e| name_taken(e, &draft.name))?
            .last_insert_rowid();

        info!(member_id = id, name = %draft.name, "member added");
        self.get(id).await
    }

    pub async fn update(&self, id: MemberId, draft: &MemberDraft) -> Result<MemberRecord> {
        let affected = sqlx::query("UPDATE members SET name = ?1, roles = ?2 WHERE id = ?3")
            .bind(&draft.name)
            .bind(join_role_list(&draft.roles))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| name_taken(e, &draft.name))?
            .rows_affected();

        if affected == 0 {
            return Err(RosterError::NotFound(format!("member {id}")));
        }
        info!(member_id = id, "member updated");
        self.get(id).await
    }

    /// Deletes the member together with their absences and assignments.
    pub async fn delete(&self, id: MemberId) -> Result<MemberDeletion> {
        let mut tx = self.pool.begin().await.map_err(RosterError::DataUnavailable)?;
        let outcome = delete_member_rows(&mut tx, id).await;
        let deletion = finish(tx, outcome).await?;

        info!(
            member_id = id,
            absences = deletion.absences_removed,
            assignments = deletion.assignments_removed,
            "member deleted"
        );
        Ok(deletion)
    }

    pub async fn find(&self, id: MemberId) -> Result<Option<MemberRecord>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, name, roles, created_at FROM members WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        row.map(MemberRecord::try_from)
            .transpose()
            .map_err(RosterError::DataUnavailable)
    }

    pub async fn get(&self, id: MemberId) -> Result<MemberRecord> {
        self.find(id)
            .await?
            .ok_or_else(|| RosterError::NotFound(format!("member {id}")))
    }

    pub async fn list(&self) -> Result<Vec<MemberRecord>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, name, roles, created_at FROM members ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        rows.into_iter()
            .map(MemberRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(RosterError::DataUnavailable)
    }

    /// Per-member load, busiest first. `window_start` bounds the recent count.
    pub async fn stats(&self, today: NaiveDate, window_start: NaiveDateTime) -> Result<Vec<MemberStats>> {
        let rows = sqlx::query_as::<_, MemberStatsRow>(
            "SELECT
                m.id,
                m.name,
                m.roles,
                COUNT(a.id) AS total_assignments,
                COALESCE(SUM(CASE WHEN a.service_at >= ?1 THEN 1 ELSE 0 END), 0) AS recent_assignments,
                MAX(a.service_at) AS last_service_at
             FROM members m
             LEFT JOIN assignments a ON a.member_id = m.id
             GROUP BY m.id, m.name, m.roles
             ORDER BY total_assignments DESC, m.name ASC",
        )
        .bind(window_start)
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        rows.into_iter()
            .map(|row| {
                let roles = parse_role_list(&row.roles)
                    .map_err(|e| RosterError::DataUnavailable(sqlx::Error::Decode(Box::new(e))))?;
                Ok(MemberStats {
                    member_id: row.id,
                    name: row.name,
                    roles,
                    total_assignments: row.total_assignments,
                    recent_assignments: row.recent_assignments,
                    days_since_last_service: row
                        .last_service_at
                        .map(|last| (today - last.date()).num_days()),
                    last_service_at: row.last_service_at,
                })
            })
            .collect()
    }
}

async fn delete_member_rows(conn: &mut SqliteConnection, id: MemberId) -> Result<MemberDeletion> {
    // 1. the member must exist
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE id = ?1")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?;
    if exists == 0 {
        return Err(RosterError::NotFound(format!("member {id}")));
    }

    // 2. dependents
    let absences_removed = sqlx::query("DELETE FROM absences WHERE member_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?
        .rows_affected();

    let assignments_removed = sqlx::query("DELETE FROM assignments WHERE member_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?
        .rows_affected();

    // 3. the member
    sqlx::query("DELETE FROM members WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?;

    Ok(MemberDeletion {
        member_id: id,
        absences_removed,
        assignments_removed,
    })
}
