//! Tag endpoints

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::{OneOrMany, TAGS, detail_response, find_by_id};
use crate::AppState;
use crate::auth::require_privilege;
use crate::db::UpsertTag;
use crate::entities::Tag;
use crate::error::{ApiError, ApiResult};
use crate::query::acl::TAG_MANAGER;
use crate::query::{Identity, QueryParams, SqlValue, TableResponse};

/// A tag named in a delete body. Set fields must all match.
#[derive(Debug, Default, Deserialize)]
pub struct TagRef {
    pub id: Option<i64>,
    pub tag_id: Option<String>,
    pub tag_name: Option<String>,
}

impl TagRef {
    fn condition(&self) -> Option<(String, Vec<SqlValue>)> {
        let mut parts = Vec::new();
        let mut values = Vec::new();
        if let Some(id) = self.id {
            parts.push(r#""tags"."id" = ?"#);
            values.push(SqlValue::Int(id));
        }
        if let Some(tag_id) = &self.tag_id {
            parts.push(r#""tags"."tag_id" = ?"#);
            values.push(SqlValue::from(tag_id));
        }
        if let Some(tag_name) = &self.tag_name {
            parts.push(r#""tags"."tag_name" = ?"#);
            values.push(SqlValue::from(tag_name));
        }
        if parts.is_empty() {
            None
        } else {
            Some((format!("({})", parts.join(" AND ")), values))
        }
    }
}

/// Combined predicate of every usable ref, `None` when the body names nothing.
fn refs_condition(refs: &[TagRef]) -> Option<(String, Vec<SqlValue>)> {
    let (conditions, values): (Vec<String>, Vec<Vec<SqlValue>>) =
        refs.iter().filter_map(TagRef::condition).unzip();
    if conditions.is_empty() {
        return None;
    }
    Some((format!("({})", conditions.join(" OR ")), values.into_iter().flatten().collect()))
}

fn parse_refs(body: &[u8]) -> ApiResult<Vec<TagRef>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice::<OneOrMany<TagRef>>(body)
        .map(OneOrMany::into_vec)
        .map_err(|e| ApiError::BadRequest(format!("Invalid tag list: {}", e)))
}

async fn list_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let response = state
        .registry
        .request("tags")?
        .make_table_response(state.db.pool(), &identity, &params)
        .await?;
    Ok(Json(response))
}

/// Create or update tags by name.
async fn post_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Json(body): Json<OneOrMany<UpsertTag>>,
) -> ApiResult<Json<TableResponse>> {
    require_privilege(&identity, TAG_MANAGER)?;

    let inputs = body.into_vec();
    if inputs.iter().any(|t| t.tag_name.trim().is_empty()) {
        return Err(ApiError::BadRequest("tag_name must not be empty".to_string()));
    }

    let repo = state.db.tags();
    let mut tags = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let tag = repo.upsert(input).await?;
        info!(tag_name = %tag.tag_name, tag_id = %tag.tag_id, by = %identity.name, "Tag saved");
        tags.push(tag);
    }

    Ok(Json(detail_response(&state, "tags", &tags, &params)?))
}

/// Delete the tags named in the body, or matched by the filters.
async fn delete_tags(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    body: Bytes,
) -> ApiResult<Response> {
    require_privilege(&identity, TAG_MANAGER)?;

    let refs = parse_refs(&body)?;
    let named = refs_condition(&refs);

    let mut rq = state
        .registry
        .request("tags")?
        .acl(false)
        .write_intent(true)
        .paging(false);
    if let Some((condition, values)) = &named {
        rq.where_clause(condition, values.clone());
    }
    rq.tx(&identity, &params)?;

    if named.is_none() && !rq.has_valid_filters() {
        return Err(ApiError::Forbidden(
            "Refusing to delete every tag: name tags in the body or pass filters".to_string(),
        ));
    }

    let tags: Vec<Tag> = rq.into_query().fetch_all(state.db.pool()).await?;
    if tags.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let deleted = state.db.tags().delete_many(&tags).await?;
    info!(count = deleted, by = %identity.name, "Tags deleted");

    Ok(Json(detail_response(&state, "tags", &tags, &params)?).into_response())
}

async fn get_tag(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let rq = state.registry.request("tags")?;
    let tags: Vec<Tag> = find_by_id(&state, rq, &identity, &params, &TAGS, &id).await?;
    Ok(Json(detail_response(&state, "tags", &tags, &params)?))
}

async fn delete_tag(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    require_privilege(&identity, TAG_MANAGER)?;

    let rq = state.registry.request("tags")?.acl(false).write_intent(true);
    let tags: Vec<Tag> = find_by_id(&state, rq, &identity, &params, &TAGS, &id).await?;
    if tags.is_empty() {
        return Err(ApiError::NotFound);
    }

    state.db.tags().delete_many(&tags).await?;
    info!(tag = %id, by = %identity.name, "Tag deleted");

    Ok(Json(detail_response(&state, "tags", &tags, &params)?))
}

/// Nodes carrying the tag.
async fn tag_nodes(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("nodes")?;
    TAGS.narrow(&mut rq, &id);
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

/// Services carrying the tag.
async fn tag_services(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("services")?;
    TAGS.narrow(&mut rq, &id);
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

/// Tags not yet attached to the object whose `column` in `attachments`
/// equals `key`.
pub(super) async fn candidate_tags(
    state: &AppState,
    identity: &Identity,
    params: &QueryParams,
    attachments: &str,
    column: &str,
    key: &str,
) -> ApiResult<Json<TableResponse>> {
    let mut rq = state.registry.request("tags")?.acl(false);
    rq.not_clause(
        &format!(
            r#""tags"."tag_id" IN (SELECT "tag_id" FROM "{}" WHERE "{}" = ?)"#,
            attachments, column
        ),
        vec![SqlValue::from(key)],
    );
    let response = rq.make_table_response(state.db.pool(), identity, params).await?;
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(post_tags).delete(delete_tags))
        .route("/tags/{id}", get(get_tag).delete(delete_tag))
        .route("/tags/{id}/nodes", get(tag_nodes))
        .route("/tags/{id}/services", get(tag_services))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_bodies_name_nothing() {
        assert!(parse_refs(b"").unwrap().is_empty());
        assert!(parse_refs(b"  \n").unwrap().is_empty());
        assert!(refs_condition(&parse_refs(b"[{}]").unwrap()).is_none());
        assert!(parse_refs(b"{not json").is_err());
    }

    #[test]
    fn refs_combine_with_or() {
        let refs = parse_refs(br#"[{"id": 3}, {"tag_name": "prod", "tag_id": "ab"}]"#).unwrap();
        let (sql, values) = refs_condition(&refs).unwrap();
        assert_eq!(
            sql,
            r#"(("tags"."id" = ?) OR ("tags"."tag_id" = ? AND "tags"."tag_name" = ?))"#
        );
        assert_eq!(
            values,
            vec![SqlValue::Int(3), SqlValue::from("ab"), SqlValue::from("prod")]
        );
    }

    #[test]
    fn single_object_body() {
        let refs = parse_refs(br#"{"tag_name": "prod"}"#).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].tag_name.as_deref(), Some("prod"));
    }
}
