//! Automatic schema synchronization from table definitions
//!
//! - Creates missing tables from the registered field definitions
//! - Adds missing columns
//! - Does NOT handle column renames or type changes

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::query::{FieldDef, Registry, Table};

/// Result of a schema sync operation
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
    pub columns_added: Vec<(String, String)>, // (table, column)
    pub errors: Vec<String>,
}

impl SchemaSyncResult {
    fn merge(&mut self, other: SchemaSyncResult) {
        self.tables_created.extend(other.tables_created);
        self.columns_added.extend(other.columns_added);
        self.errors.extend(other.errors);
    }
}

/// Check if a table exists in the database
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Get existing columns for a table
async fn get_table_columns(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(i32, String, String, i32, Option<String>, i32)> =
        sqlx::query_as(&format!("PRAGMA table_info(\"{}\")", table_name))
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(_, name, _, _, _, _)| name).collect())
}

/// Sync a single table to the database
pub async fn sync_table(pool: &SqlitePool, table: &Table) -> Result<SchemaSyncResult, sqlx::Error> {
    let mut result = SchemaSyncResult::default();
    let table_name = table.name();

    if !table_exists(pool, table_name).await? {
        let create_sql = table.create_table_sql();
        debug!("Creating table {}: {}", table_name, create_sql);

        match sqlx::query(&create_sql).execute(pool).await {
            Ok(_) => {
                info!("Created table: {}", table_name);
                result.tables_created.push(table_name.to_string());
            }
            Err(e) => {
                let msg = format!("Failed to create table {}: {}", table_name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
        return Ok(result);
    }

    let existing_columns = get_table_columns(pool, table_name).await?;
    for field in table.fields() {
        if existing_columns.iter().any(|c| c == field.name) {
            continue;
        }

        let alter_sql = generate_add_column_sql(table_name, field);
        debug!("Adding column to {}: {}", table_name, alter_sql);

        match sqlx::query(&alter_sql).execute(pool).await {
            Ok(_) => {
                info!("Added column {}.{}", table_name, field.name);
                result
                    .columns_added
                    .push((table_name.to_string(), field.name.to_string()));
            }
            Err(e) => {
                let msg = format!("Failed to add column {}.{}: {}", table_name, field.name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    }

    Ok(result)
}

/// Generate ALTER TABLE ADD COLUMN SQL
fn generate_add_column_sql(table_name: &str, field: &FieldDef) -> String {
    // SQLite cannot add PRIMARY KEY or UNIQUE columns, nor NOT NULL ones
    // without a default.
    let mut sql = format!(
        "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
        table_name, field.name, field.sql_type
    );

    if !field.nullable {
        let default_val = match field.sql_type {
            "INTEGER" | "BOOLEAN" => "0",
            "REAL" => "0.0",
            _ => "''",
        };
        sql.push_str(&format!(" NOT NULL DEFAULT {}", default_val));
    }

    sql
}

/// Sync every registered table to the database.
///
/// Called at startup so that all tables exist with their declared columns.
pub async fn sync_all_tables(pool: &SqlitePool, registry: &Registry) -> SchemaSyncResult {
    let mut total_result = SchemaSyncResult::default();

    for table in registry.tables() {
        match sync_table(pool, table).await {
            Ok(result) => total_result.merge(result),
            Err(e) => {
                total_result
                    .errors
                    .push(format!("Error syncing {}: {}", table.name(), e));
            }
        }
    }

    if !total_result.tables_created.is_empty() {
        info!(tables = ?total_result.tables_created, "Schema sync created tables");
    }
    if !total_result.columns_added.is_empty() {
        info!(columns = ?total_result.columns_added, "Schema sync added columns");
    }

    total_result
}
