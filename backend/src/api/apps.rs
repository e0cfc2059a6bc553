//! App endpoints

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use super::{APPS, detail_response, find_by_id};
use crate::AppState;
use crate::entities::App;
use crate::error::ApiResult;
use crate::query::{Identity, QueryParams, TableResponse};

async fn list_apps(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let response = state
        .registry
        .request("apps")?
        .make_table_response(state.db.pool(), &identity, &params)
        .await?;
    Ok(Json(response))
}

async fn get_app(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("apps")?;
    let apps: Vec<App> = find_by_id(&state, rq, &identity, &params, &APPS, &id).await?;
    Ok(Json(detail_response(&state, "apps", &apps, &params)?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apps", get(list_apps))
        .route("/apps/{id}", get(get_app))
}
