use chrono::NaiveDateTime;
use roster_engine::{EngineError, MemberId};
use thiserror::Error;

use crate::application::time::{format_date, format_service};

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("schedule already exists for {}", list_services(.services))]
    ScheduleConflict { services: Vec<NaiveDateTime> },

    #[error("data unavailable: {0}")]
    DataUnavailable(#[source] sqlx::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("member {member_id} is absent on {}", format_date(.service_at.date()))]
    MemberAbsent {
        member_id: MemberId,
        service_at: NaiveDateTime,
    },

    #[error("transaction failed: {0}")]
    TransactionFailed(#[source] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<EngineError> for RosterError {
    fn from(err: EngineError) -> Self {
        RosterError::InvalidRequest(err.to_string())
    }
}

impl RosterError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        RosterError::InvalidRequest(msg.into())
    }
}

fn list_services(services: &[NaiveDateTime]) -> String {
    services
        .iter()
        .map(|s| format_service(*s))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, RosterError>;
