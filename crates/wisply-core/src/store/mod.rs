// ── Persistence ──
//
// SQLite-backed storage for routers, customers, and the profile cache.
// Query functions are free async functions over the pool, grouped per
// table. Writes to router rows are field-scoped: each component updates
// only the columns it owns, so the health monitor and the scanner can run
// on overlapping schedules without clobbering each other's snapshots.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use crate::error::CoreError;

pub mod customers;
pub mod profiles;
pub mod routers;

const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the SQLite database. Cheap to clone (the pool is shared).
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at the given URL and apply
    /// the schema.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // A shared in-memory database only exists per-connection; keep the
        // pool at one connection so every query sees the same data.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        debug!(url, "database ready");
        Ok(Self { pool })
    }

    /// An in-memory database for tests and dry experiments.
    pub async fn in_memory() -> Result<Self, CoreError> {
        Self::connect("sqlite::memory:").await
    }

    /// The underlying pool, for the per-table query functions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
