use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

use application::notify::ScheduleNotifier;
use config::{DatabaseConfig, RosterConfig};
use error::{Result, RosterError};
use infrastructure::absence_repo::AbsenceRepository;
use infrastructure::availability_repo::AvailabilityRepository;
use infrastructure::member_repo::MemberRepository;
use infrastructure::schedule_repo::ScheduleRepository;
use roster_engine::AssignmentEngine;

// Holds every repository plus the engine and the change notifier
pub struct AppServices {
    pub members: MemberRepository,
    pub absences: AbsenceRepository,
    pub schedules: ScheduleRepository,
    pub availability: AvailabilityRepository,
    pub engine: AssignmentEngine,
    pub notifier: ScheduleNotifier,
    pub history_window_days: u32,
}

impl AppServices {
    pub fn new(pool: SqlitePool, config: &RosterConfig) -> Self {
        Self {
            members: MemberRepository::new(pool.clone()),
            absences: AbsenceRepository::new(pool.clone()),
            schedules: ScheduleRepository::new(pool.clone()),
            availability: AvailabilityRepository::new(pool, config.history_window_days),
            engine: AssignmentEngine::new(config.engine.clone()),
            notifier: ScheduleNotifier::new(config.notify_capacity),
            history_window_days: config.history_window_days,
        }
    }

    /// Connects, migrates and wires everything up.
    pub async fn open(config: &RosterConfig) -> Result<Self> {
        let pool = connect(&config.database).await?;
        Ok(Self::new(pool, config))
    }
}

// =====================
// Database
// =====================

/// Opens the pool and applies pending migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(RosterError::DataUnavailable)?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(RosterError::DataUnavailable)?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!(url = %config.url, "database ready");
    Ok(pool)
}
