use chrono::NaiveDate;
use roster_engine::MemberId;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::domain::absence_model::*;
use crate::error::{Result, RosterError};
use crate::infrastructure::finish;
use crate::infrastructure::schedule_repo::{assignments_in_range, delete_assignments_in_range};

pub struct AbsenceRepository {
    pool: SqlitePool,
}

impl AbsenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores an absence and removes the member's assignments it covers.
    ///
    /// Both happen in one transaction: if the insert fails, the removed
    /// assignments are restored.
    pub async fn record_with_cascade(&self, absence: &NewAbsence) -> Result<AbsenceOutcome> {
        let mut tx = self.pool.begin().await.map_err(RosterError::DataUnavailable)?;
        let outcome = write_absence(&mut tx, None, absence).await;
        let outcome = finish(tx, outcome).await?;

        info!(
            member_id = absence.member_id,
            absence_id = outcome.absence.id,
            removed = outcome.removed_count(),
            "absence recorded"
        );
        Ok(outcome)
    }

    /// Moves an existing absence to a new range, with the same cascade as recording.
    pub async fn update_with_cascade(&self, id: i64, absence: &NewAbsence) -> Result<AbsenceOutcome> {
        let mut tx = self.pool.begin().await.map_err(RosterError::DataUnavailable)?;
        let outcome = write_absence(&mut tx, Some(id), absence).await;
        let outcome = finish(tx, outcome).await?;

        info!(
            member_id = absence.member_id,
            absence_id = id,
            removed = outcome.removed_count(),
            "absence updated"
        );
        Ok(outcome)
    }

    pub async fn delete(&self, id: i64) -> Result<Absence> {
        let absence = self
            .find(id)
            .await?
            .ok_or_else(|| RosterError::NotFound(format!("absence {id}")))?;

        sqlx::query("DELETE FROM absences WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RosterError::DataUnavailable)?;

        info!(absence_id = id, member_id = absence.member_id, "absence deleted");
        Ok(absence)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Absence>> {
        sqlx::query_as::<_, Absence>(
            "SELECT id, member_id, start_date, end_date, reason FROM absences WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)
    }

    /// Most recent first.
    pub async fn list(&self) -> Result<Vec<Absence>> {
        sqlx::query_as::<_, Absence>(
            "SELECT id, member_id, start_date, end_date, reason
             FROM absences
             ORDER BY start_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)
    }

    pub async fn for_member(&self, member_id: MemberId) -> Result<Vec<Absence>> {
        sqlx::query_as::<_, Absence>(
            "SELECT id, member_id, start_date, end_date, reason
             FROM absences
             WHERE member_id = ?1
             ORDER BY start_date DESC, id DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)
    }

    pub async fn is_absent(&self, member_id: MemberId, date: NaiveDate) -> Result<bool> {
        let hits: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM absences
             WHERE member_id = ?1 AND start_date <= ?2 AND end_date >= ?2",
        )
        .bind(member_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;
        Ok(hits > 0)
    }
}

// `existing` is the absence being moved, or None for a new one.
async fn write_absence(
    conn: &mut SqliteConnection,
    existing: Option<i64>,
    absence: &NewAbsence,
) -> Result<AbsenceOutcome> {
    let member_id = absence.member_id;

    // 1. referenced rows must exist
    let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE id = ?1")
        .bind(member_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?;
    if members == 0 {
        return Err(RosterError::NotFound(format!("member {member_id}")));
    }

    if let Some(id) = existing {
        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM absences WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await
            .map_err(RosterError::TransactionFailed)?;
        if found == 0 {
            return Err(RosterError::NotFound(format!("absence {id}")));
        }
    }

    // 2. no overlap with the member's other absences
    let overlapping: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM absences
         WHERE member_id = ?1
           AND start_date <= ?3
           AND end_date >= ?2
           AND id != COALESCE(?4, -1)",
    )
    .bind(member_id)
    .bind(absence.start_date)
    .bind(absence.end_date)
    .bind(existing)
    .fetch_one(&mut *conn)
    .await
    .map_err(RosterError::TransactionFailed)?;
    if overlapping > 0 {
        return Err(RosterError::Conflict(format!(
            "member {member_id} already has an absence between {} and {}",
            absence.start_date, absence.end_date
        )));
    }

    // 3. cascade
    let removed = assignments_in_range(&mut *conn, member_id, absence.start_date, absence.end_date)
        .await
        .map_err(RosterError::TransactionFailed)?;
    delete_assignments_in_range(&mut *conn, member_id, absence.start_date, absence.end_date)
        .await
        .map_err(RosterError::TransactionFailed)?;

    // 4. the absence itself
    let id = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE absences SET start_date = ?1, end_date = ?2, reason = ?3 WHERE id = ?4",
            )
            .bind(absence.start_date)
            .bind(absence.end_date)
            .bind(&absence.reason)
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(RosterError::TransactionFailed)?;
            id
        }
        None => sqlx::query(
            "INSERT INTO absences (member_id, start_date, end_date, reason) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(member_id)
        .bind(absence.start_date)
        .bind(absence.end_date)
        .bind(&absence.reason)
        .execute(&mut *conn)
        .await
        .map_err(RosterError::TransactionFailed)?
        .last_insert_rowid(),
    };

    Ok(AbsenceOutcome {
        absence: Absence {
            id,
            member_id,
            start_date: absence.start_date,
            end_date: absence.end_date,
            reason: absence.reason.clone(),
        },
        removed,
    })
}
