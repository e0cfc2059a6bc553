//! Node endpoints

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value};
use tracing::info;

use super::tags::candidate_tags;
use super::{NODES, detail_response, find_by_id};
use crate::AppState;
use crate::auth::require_privilege;
use crate::entities::Node;
use crate::error::{ApiError, ApiResult};
use crate::query::acl::NODE_MANAGER;
use crate::query::{Identity, Property, QueryParams, SqlValue, TableResponse};

/// Columns set by the collector, never by clients.
const READ_ONLY: &[&str] = &["id", "node_id"];

async fn list_nodes(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let response = state
        .registry
        .request("nodes")?
        .make_table_response(state.db.pool(), &identity, &params)
        .await?;
    Ok(Json(response))
}

async fn get_node(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("nodes")?;
    let nodes: Vec<Node> = find_by_id(&state, rq, &identity, &params, &NODES, &id).await?;
    Ok(Json(detail_response(&state, "nodes", &nodes, &params)?))
}

/// The single node addressed by `id` that the caller may modify.
async fn writable_node(
    state: &AppState,
    identity: &Identity,
    params: &QueryParams,
    id: &str,
) -> ApiResult<Node> {
    let rq = state.registry.request("nodes")?.write_intent(true).filters(false);
    let mut nodes: Vec<Node> = find_by_id(state, rq, identity, params, &NODES, id).await?;
    match nodes.len() {
        0 => Err(ApiError::NotFound),
        1 => Ok(nodes.remove(0)),
        n => Err(ApiError::BadRequest(format!("{} nodes match {}", n, id))),
    }
}

/// Translate posted properties into column assignments.
fn node_changes(state: &AppState, body: &Map<String, Value>) -> ApiResult<Vec<(String, SqlValue)>> {
    let table = state.registry.table("nodes")?;
    let mut changes = Vec::with_capacity(body.len());
    for (key, value) in body {
        let Some(column) = table.field_of(&Property::new("nodes", key.as_str())) else {
            return Err(ApiError::BadRequest(format!("Unknown node property {}", key)));
        };
        if READ_ONLY.contains(&column) {
            return Err(ApiError::BadRequest(format!("Node property {} is read-only", key)));
        }
        changes.push((column.to_string(), SqlValue::from_json(value)));
    }
    Ok(changes)
}

async fn post_node(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<TableResponse>> {
    require_privilege(&identity, NODE_MANAGER)?;

    let changes = node_changes(&state, &body)?;
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No properties to update".to_string()));
    }
    let node = writable_node(&state, &identity, &params, &id).await?;

    state.db.nodes().update(node.id, &changes).await?;
    info!(
        nodename = %node.nodename,
        columns = ?changes.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>(),
        by = %identity.name,
        "Node updated"
    );

    let updated = state.db.nodes().get_by_node_id(&node.node_id).await?;
    let rows: Vec<Node> = updated.into_iter().collect();
    Ok(Json(detail_response(&state, "nodes", &rows, &params)?))
}

async fn delete_node(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    require_privilege(&identity, NODE_MANAGER)?;

    let node = writable_node(&state, &identity, &params, &id).await?;
    state.db.nodes().delete(&node).await?;
    info!(nodename = %node.nodename, by = %identity.name, "Node deleted");

    Ok(Json(detail_response(&state, "nodes", &[node], &params)?))
}

/// Tag attachments of all visible nodes.
async fn list_node_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("node_tags")?;
    rq.auto_join("nodes");
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

/// Tags attached to the node.
async fn node_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("tags")?;
    NODES.narrow(&mut rq, &id);
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

/// Tags that could still be attached to the node.
async fn node_candidate_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("nodes")?.filters(false);
    let nodes: Vec<Node> = find_by_id(&state, rq, &identity, &params, &NODES, &id).await?;
    let node = nodes.first().ok_or(ApiError::NotFound)?;
    candidate_tags(&state, &identity, &params, "node_tags", "node_id", &node.node_id).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nodes", get(list_nodes))
        .route("/nodes/tags", get(list_node_tags))
        .route("/nodes/{id}", get(get_node).post(post_node).delete(delete_node))
        .route("/nodes/{id}/tags", get(node_tags))
        .route("/nodes/{id}/candidate_tags", get(node_candidate_tags))
}
