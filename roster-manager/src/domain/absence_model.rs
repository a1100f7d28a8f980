use chrono::{NaiveDate, NaiveDateTime};
use roster_engine::{MemberId, Role};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::application::time::format_service;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Absence {
    pub id: i64,
    pub member_id: MemberId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

/// Validated absence input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAbsence {
    pub member_id: MemberId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

/// An assignment deleted because an absence now covers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedAssignment {
    pub assignment_id: i64,
    pub service_at: NaiveDateTime,
    pub role: Role,
}

impl RemovedAssignment {
    pub fn describe(&self) -> String {
        format!("removed from slot {} ({})", format_service(self.service_at), self.role)
    }
}

/// Result of recording an absence: the stored row plus whatever it displaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbsenceOutcome {
    pub absence: Absence,
    pub removed: Vec<RemovedAssignment>,
}

impl AbsenceOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.removed.iter().map(RemovedAssignment::describe).collect()
    }
}
