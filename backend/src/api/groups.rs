//! Group endpoints
//!
//! Groups carry no app scope, so reads skip access control.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use super::{GROUPS, detail_response, find_by_id};
use crate::AppState;
use crate::entities::Group;
use crate::error::ApiResult;
use crate::query::{Identity, QueryParams, TableResponse};

async fn list_groups(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let response = state
        .registry
        .request("auth_group")?
        .acl(false)
        .make_table_response(state.db.pool(), &identity, &params)
        .await?;
    Ok(Json(response))
}

async fn get_group(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("auth_group")?.acl(false);
    let groups: Vec<Group> = find_by_id(&state, rq, &identity, &params, &GROUPS, &id).await?;
    Ok(Json(detail_response(&state, "auth_group", &groups, &params)?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups))
        .route("/groups/{id}", get(get_group))
}
