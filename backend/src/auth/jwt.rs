//! Token issuance and verification
//!
//! Tokens are HS256 JWTs. The `kind` claim records which [`Caller`] variant
//! the subject belongs to.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::query::{Caller, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Node,
    User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// node_id for nodes, user id for users
    pub sub: String,
    pub kind: TokenKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub privileges: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_expire_at: DateTime<Utc>,
}

/// Sign a token for `identity`, valid for `lifetime_secs`.
pub fn issue_token(
    identity: &Identity,
    app: Option<String>,
    secret: &str,
    lifetime_secs: i64,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(lifetime_secs);

    let (sub, kind) = match &identity.caller {
        Caller::Node { node_id } => (node_id.clone(), TokenKind::Node),
        Caller::User { user_id } => (user_id.to_string(), TokenKind::User),
    };

    let claims = TokenClaims {
        sub,
        kind,
        name: identity.name.clone(),
        privileges: identity.privileges.clone(),
        app,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(IssuedToken {
        token,
        token_expire_at: expires_at,
    })
}

/// Verify a token and rebuild the caller identity from its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Identity, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_aud = false;

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT verification failed: {}", e);
        ApiError::Unauthorized(format!("Invalid token: {}", e))
    })?;

    let claims = token_data.claims;
    let caller = match claims.kind {
        TokenKind::Node => Caller::Node { node_id: claims.sub },
        TokenKind::User => Caller::User {
            user_id: claims
                .sub
                .parse()
                .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?,
        },
    };

    Ok(Identity {
        caller,
        name: claims.name,
        privileges: claims.privileges,
    })
}
