use chrono::{NaiveDate, NaiveDateTime};
use roster_engine::Role;
use roster_manager_lib::config::RosterConfig;
use roster_manager_lib::AppServices;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

// In-memory DB with the production schema. One connection, so every
// query sees the same database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create memory pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

pub fn app(pool: SqlitePool) -> AppServices {
    AppServices::new(pool, &RosterConfig::in_memory())
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    day(y, m, d).and_hms_opt(h, min, 0).expect("valid time")
}

/// Inserts a member directly; `roles` is the stored comma form.
pub async fn seed_member(pool: &SqlitePool, name: &str, roles: &str) -> i64 {
    sqlx::query("INSERT INTO members (name, roles) VALUES (?1, ?2)")
        .bind(name)
        .bind(roles)
        .execute(pool)
        .await
        .expect("seed member")
        .last_insert_rowid()
}

pub async fn seed_assignment(pool: &SqlitePool, member_id: i64, service_at: NaiveDateTime, role: Role) -> i64 {
    sqlx::query("INSERT INTO assignments (member_id, service_at, role) VALUES (?1, ?2, ?3)")
        .bind(member_id)
        .bind(service_at)
        .bind(role.as_str())
        .execute(pool)
        .await
        .expect("seed assignment")
        .last_insert_rowid()
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
