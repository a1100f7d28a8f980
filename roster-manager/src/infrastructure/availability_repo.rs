use chrono::{NaiveDate, NaiveDateTime};
use roster_engine::{AvailableMember, HistoryFacts, Role};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::application::time::window_start;
use crate::domain::member_model::{MemberRecord, MemberRow};
use crate::error::{Result, RosterError};

/// Availability resolver: who can serve on a date, and what their
/// persisted history looks like from there.
pub struct AvailabilityRepository {
    pool: SqlitePool,
    history_window_days: u32,
}

#[derive(FromRow)]
struct CandidateRow {
    id: i64,
    name: String,
    roles: String,
    created_at: NaiveDateTime,
    last_service_at: Option<NaiveDateTime>,
    last_role: Option<String>,
    recent_count: i64,
}

impl CandidateRow {
    fn into_available(self, date: NaiveDate) -> std::result::Result<AvailableMember, sqlx::Error> {
        let last_assigned_role = self
            .last_role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let history = HistoryFacts {
            ever_assigned: self.last_service_at.is_some(),
            days_since_last_assignment: self
                .last_service_at
                .map(|last| (date - last.date()).num_days()),
            assignments_in_last_90_days: u32::try_from(self.recent_count).unwrap_or(u32::MAX),
            last_assigned_role,
        };

        let record = MemberRecord::try_from(MemberRow {
            id: self.id,
            name: self.name,
            roles: self.roles,
            created_at: self.created_at,
        })?;
        Ok(AvailableMember::new(record.to_member(), history))
    }
}

impl AvailabilityRepository {
    pub fn new(pool: SqlitePool, history_window_days: u32) -> Self {
        Self {
            pool,
            history_window_days,
        }
    }

    /// Members without an absence covering `date`, ordered by id.
    ///
    /// The recent-assignment window ends at `as_of`. Read-only; any store
    /// failure surfaces as `DataUnavailable`.
    pub async fn resolve(&self, date: NaiveDate, as_of: NaiveDate) -> Result<Vec<AvailableMember>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT
                m.id,
                m.name,
                m.roles,
                m.created_at,
                (SELECT MAX(a.service_at) FROM assignments a
                  WHERE a.member_id = m.id) AS last_service_at,
                (SELECT a.role FROM assignments a
                  WHERE a.member_id = m.id
                  ORDER BY a.service_at DESC, a.id DESC
                  LIMIT 1) AS last_role,
                (SELECT COUNT(*) FROM assignments a
                  WHERE a.member_id = m.id AND a.service_at >= ?2) AS recent_count
             FROM members m
             WHERE NOT EXISTS (
                SELECT 1 FROM absences ab
                 WHERE ab.member_id = m.id
                   AND ab.start_date <= ?1
                   AND ab.end_date >= ?1
             )
             ORDER BY m.id ASC",
        )
        .bind(date)
        .bind(window_start(as_of, self.history_window_days))
        .fetch_all(&self.pool)
        .await
        .map_err(RosterError::DataUnavailable)?;

        let available = rows
            .into_iter()
            .map(|row| row.into_available(date))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(RosterError::DataUnavailable)?;

        debug!(%date, available = available.len(), "availability resolved");
        Ok(available)
    }
}
