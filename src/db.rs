use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::error::ErrorKind;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

fn error_kind(err: &sqlx::Error) -> Option<ErrorKind> {
    match err {
        sqlx::Error::Database(db_err) => Some(db_err.kind()),
        _ => None,
    }
}

/// Duplicate key (MySQL 1062).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(error_kind(err), Some(ErrorKind::UniqueViolation))
}

/// Missing parent or still-referenced row (MySQL 1451/1452).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(error_kind(err), Some(ErrorKind::ForeignKeyViolation))
}
