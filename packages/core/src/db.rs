//! Database connection pool and migrations.
//!
//! Call [`create_pool`] at startup. It connects to the SQLite database
//! (creating the file if needed) and runs all pending migrations via
//! `sqlx::migrate!`.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Create a SQLite connection pool and run all pending migrations.
///
/// `database_url` must be a valid SQLite connection string, e.g.:
/// - `"sqlite://gas_fees.db"`: file-based database
/// - `"sqlite::memory:"`: in-memory database (useful for tests)
///
/// An in-memory database only lives as long as its connection, so the pool
/// is pinned to a single connection that is never recycled.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let mut pool_options = SqlitePoolOptions::new().max_connections(5);
    if database_url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
