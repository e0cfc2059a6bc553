//! Service endpoints

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use super::tags::candidate_tags;
use super::{SERVICES, detail_response, find_by_id};
use crate::AppState;
use crate::entities::Service;
use crate::error::{ApiError, ApiResult};
use crate::query::{Identity, QueryParams, TableResponse};

async fn list_services(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let response = state
        .registry
        .request("services")?
        .make_table_response(state.db.pool(), &identity, &params)
        .await?;
    Ok(Json(response))
}

async fn get_service(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("services")?;
    let services: Vec<Service> = find_by_id(&state, rq, &identity, &params, &SERVICES, &id).await?;
    Ok(Json(detail_response(&state, "services", &services, &params)?))
}

/// Tag attachments of all visible services.
async fn list_service_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("svc_tags")?;
    rq.auto_join("services");
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

async fn service_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("tags")?;
    SERVICES.narrow(&mut rq, &id);
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

async fn service_candidate_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("services")?.filters(false);
    let services: Vec<Service> = find_by_id(&state, rq, &identity, &params, &SERVICES, &id).await?;
    let service = services.first().ok_or(ApiError::NotFound)?;
    candidate_tags(&state, &identity, &params, "svc_tags", "svc_id", &service.svc_id).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/tags", get(list_service_tags))
        .route("/services/{id}", get(get_service))
        .route("/services/{id}/tags", get(service_tags))
        .route("/services/{id}/candidate_tags", get(service_candidate_tags))
}
