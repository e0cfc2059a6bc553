//! Token issuance endpoints
//!
//! Callers authenticated by any strategy exchange their credentials for a
//! short lived bearer token.

use axum::extract::State;
use axum::{Json, Router, routing::get};

use crate::AppState;
use crate::auth::jwt::{IssuedToken, issue_token};
use crate::error::{ApiError, ApiResult};
use crate::query::{Caller, Identity};

/// Token for a node agent, carrying the node's app.
async fn node_token(State(state): State<AppState>, identity: Identity) -> ApiResult<Json<IssuedToken>> {
    let Caller::Node { node_id } = &identity.caller else {
        return Err(ApiError::Forbidden("Node credentials required".to_string()));
    };

    let app = state
        .db
        .nodes()
        .get_by_node_id(node_id)
        .await?
        .and_then(|node| node.app)
        .filter(|app| !app.is_empty());

    sign(&state, &identity, app)
}

/// Token for a user, carrying the user's privileges.
async fn user_token(State(state): State<AppState>, identity: Identity) -> ApiResult<Json<IssuedToken>> {
    if !matches!(identity.caller, Caller::User { .. }) {
        return Err(ApiError::Forbidden("User credentials required".to_string()));
    }
    sign(&state, &identity, None)
}

fn sign(state: &AppState, identity: &Identity, app: Option<String>) -> ApiResult<Json<IssuedToken>> {
    let issued = issue_token(
        identity,
        app,
        &state.config.jwt_secret,
        state.config.token_lifetime_secs,
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    tracing::debug!(caller = %identity.name, expires = %issued.token_expire_at, "Issued token");
    Ok(Json(issued))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/node/token", get(node_token))
        .route("/auth/user/token", get(user_token))
}
