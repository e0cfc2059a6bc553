//! Request authentication
//!
//! Handlers take an [`Identity`] argument to require an authenticated
//! caller. Strategies are tried in order:
//!
//! 1. `Authorization: Bearer <jwt>` issued by `/auth/*/token`
//! 2. `Authorization: Basic` as node credentials (nodename + uuid)
//! 3. `Authorization: Basic` as user credentials (username or email + password)

pub mod credentials;
pub mod jwt;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::{Basic, Bearer};
use axum_extra::headers::{Authorization, HeaderMapExt};

use crate::AppState;
use crate::error::ApiError;
use crate::query::Identity;

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(Authorization(bearer)) = parts.headers.typed_get::<Authorization<Bearer>>() {
            return jwt::verify_token(bearer.token(), &state.config.jwt_secret);
        }

        if let Some(Authorization(basic)) = parts.headers.typed_get::<Authorization<Basic>>() {
            if let Some(identity) =
                credentials::authenticate_node(&state.db, basic.username(), basic.password()).await?
            {
                return Ok(identity);
            }
            if let Some(identity) =
                credentials::authenticate_user(&state.db, basic.username(), basic.password()).await?
            {
                return Ok(identity);
            }
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }

        Err(ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Fail with 403 unless the caller holds `privilege`.
pub fn require_privilege(identity: &Identity, privilege: &str) -> Result<(), ApiError> {
    if identity.has_privilege(privilege) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("{} privilege required", privilege)))
    }
}
