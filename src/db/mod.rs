pub mod customers;
pub mod events;
pub mod invoices;

use std::str::FromStr;

use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// key: billing-store -> file backed pool with foreign keys enforced
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// key: billing-store -> ephemeral store with the schema applied
///
/// Backed by a single connection so that every caller sees the same in-memory database.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool)
        .await
        .map_err(|err| sqlx::Error::Migrate(Box::new(err)))?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    constraint_failed(err, &["2067", "1555"], "UNIQUE constraint failed")
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    constraint_failed(err, &["787"], "FOREIGN KEY constraint failed")
}

fn constraint_failed(err: &sqlx::Error, codes: &[&str], message: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err
                .code()
                .map(|code| codes.iter().any(|expected| code == *expected))
                .unwrap_or(false)
                || db_err.message().contains(message)
        }
        _ => false,
    }
}
