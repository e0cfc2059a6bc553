//! Database connection and operations

pub mod nodes;
pub mod schema_sync;
pub mod seed;
pub mod sqlite_helpers;
pub mod tags;
pub mod users;

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use nodes::NodesRepository;
pub use schema_sync::{SchemaSyncResult, sync_all_tables};
pub use seed::run_seeds;
pub use tags::{TagsRepository, UpsertTag};
pub use users::{CreateUser, UsersRepository};

use crate::query::Registry;

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new connection pool, creating the database file if missing
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database url {}", url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create missing tables and columns for every registered table
    pub async fn sync_schema(&self, registry: &Registry) -> SchemaSyncResult {
        sync_all_tables(&self.pool, registry).await
    }

    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.pool.clone())
    }

    pub fn nodes(&self) -> NodesRepository {
        NodesRepository::new(self.pool.clone())
    }

    pub fn tags(&self) -> TagsRepository {
        TagsRepository::new(self.pool.clone())
    }
}
