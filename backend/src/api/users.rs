//! User endpoints
//!
//! Users are not app scoped. Callers without the UserManager privilege
//! only ever see their own account, and node agents are refused.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::{USERS, detail_response, find_by_id};
use crate::AppState;
use crate::auth::require_privilege;
use crate::db::CreateUser;
use crate::entities::User;
use crate::error::{ApiError, ApiResult};
use crate::query::acl::USER_MANAGER;
use crate::query::{Caller, Identity, Intent, QueryParams, SqlValue, TableResponse};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

fn require_user(identity: &Identity) -> ApiResult<i64> {
    match identity.caller {
        Caller::User { user_id } => Ok(user_id),
        Caller::Node { .. } => Err(ApiError::Forbidden("Node callers cannot read users".to_string())),
    }
}

/// The user addressed by `id`, if the caller may see it.
async fn visible_user(
    state: &AppState,
    identity: &Identity,
    params: &QueryParams,
    id: &str,
) -> ApiResult<User> {
    let caller_id = require_user(identity)?;

    let rq = state.registry.request("auth_user")?.acl(false).filters(false);
    let users: Vec<User> = find_by_id(state, rq, identity, params, &USERS, id).await?;
    let user = users.into_iter().next().ok_or(ApiError::NotFound)?;

    if user.id != caller_id && !identity.has_privilege(USER_MANAGER) {
        return Err(ApiError::Forbidden(format!("{} privilege required", USER_MANAGER)));
    }
    Ok(user)
}

async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
) -> ApiResult<Json<TableResponse>> {
    let caller_id = require_user(&identity)?;

    let mut rq = state.registry.request("auth_user")?.acl(false);
    if !identity.has_privilege(USER_MANAGER) {
        rq.where_clause(r#""auth_user"."id" = ?"#, vec![SqlValue::Int(caller_id)]);
    }
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let user = visible_user(&state, &identity, &params, &id).await?;
    Ok(Json(detail_response(&state, "auth_user", &[user], &params)?))
}

async fn post_user(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<Json<TableResponse>> {
    require_privilege(&identity, USER_MANAGER)?;

    let username = body.username.trim();
    if username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("username and password are required".to_string()));
    }

    let users = state.db.users();
    if users.get_by_login(username).await?.is_some() {
        return Err(ApiError::BadRequest(format!("User {} already exists", username)));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(e.into()))?;
    let id = users
        .create(CreateUser {
            username: username.to_string(),
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            password_hash,
        })
        .await?;
    info!(user_id = id, username = %username, by = %identity.name, "User created");

    let created: Vec<User> = users.get_by_id(id).await?.into_iter().collect();
    Ok(Json(detail_response(&state, "auth_user", &created, &params)?))
}

async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    require_privilege(&identity, USER_MANAGER)?;

    let user = visible_user(&state, &identity, &params, &id).await?;
    if identity.user_id() == Some(user.id) {
        return Err(ApiError::BadRequest("Refusing to delete the calling user".to_string()));
    }

    state.db.users().delete(user.id).await?;
    info!(user_id = user.id, username = %user.username, by = %identity.name, "User deleted");

    Ok(Json(detail_response(&state, "auth_user", &[user], &params)?))
}

/// Groups the user is a member of.
async fn user_groups(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    let user = visible_user(&state, &identity, &params, &id).await?;

    let mut rq = state.registry.request("auth_group")?.acl(false);
    USERS.narrow(&mut rq, &user.id.to_string());
    let response = rq.make_table_response(state.db.pool(), &identity, &params).await?;
    Ok(Json(response))
}

/// Apps granted to the user's groups through `intent`'s grant table.
async fn user_apps(
    state: &AppState,
    identity: &Identity,
    params: &QueryParams,
    id: &str,
    intent: Intent,
) -> ApiResult<Json<TableResponse>> {
    let user = visible_user(state, identity, params, id).await?;
    let grants = intent.grant_table();

    let mut rq = state.registry.request("apps")?.acl(false);
    rq.where_clause(
        &format!(
            r#""apps"."id" IN (SELECT "{grants}"."app_id" FROM "{grants}" JOIN "auth_membership" ON "auth_membership"."group_id" = "{grants}"."group_id" WHERE "auth_membership"."user_id" = ?)"#
        ),
        vec![SqlValue::Int(user.id)],
    );
    let response = rq.make_table_response(state.db.pool(), identity, params).await?;
    Ok(Json(response))
}

async fn user_apps_publication(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    user_apps(&state, &identity, &params, &id, Intent::Read).await
}

async fn user_apps_responsible(
    State(state): State<AppState>,
    identity: Identity,
    params: QueryParams,
    Path(id): Path<String>,
) -> ApiResult<Json<TableResponse>> {
    user_apps(&state, &identity, &params, &id, Intent::Write).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(post_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/groups", get(user_groups))
        .route("/users/{id}/apps/publication", get(user_apps_publication))
        .route("/users/{id}/apps/responsible", get(user_apps_responsible))
}
