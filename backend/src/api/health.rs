//! Health check endpoints

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub database: bool,
    /// Tables the query engine serves
    pub tables: usize,
}

/// Always OK while the process is serving requests
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Verifies the database answers and every registered table exists
async fn readyz(State(state): State<AppState>) -> Json<ReadyResponse> {
    let mut db_ok = sqlx::query("SELECT 1")
        .fetch_one(state.db.pool())
        .await
        .is_ok();

    let mut tables = 0;
    for table in state.registry.tables() {
        match crate::db::schema_sync::table_exists(state.db.pool(), table.name()).await {
            Ok(true) => tables += 1,
            _ => db_ok = false,
        }
    }

    Json(ReadyResponse {
        ready: db_ok,
        database: db_ok,
        tables,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
