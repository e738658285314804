//! Authenticated principal extraction.
//!
//! Resource handlers take a [`Principal`] argument to require an admin access
//! token. The check is stateless: signature and expiry only.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use uuid::Uuid;

use super::access_token::Role;
use super::error::AuthError;
use super::state::AuthState;
use super::utils::extract_bearer_token;

/// Caller authenticated by a valid `Authorization: Bearer` access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: i64,
}

/// Resolve a bearer token into a principal.
///
/// # Errors
/// `TokenMalformed` when the header is missing or the token does not verify,
/// `TokenExpired` at or after the token's expiry.
pub fn require_admin(headers: &axum::http::HeaderMap, auth_state: &AuthState) -> Result<Principal, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::TokenMalformed)?;
    let claims = auth_state
        .signer()
        .verify(&token, auth_state.now_unix())?;
    Ok(Principal {
        user_id: claims.sub,
        role: claims.role,
        expires_at: claims.exp,
    })
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<Arc<AuthState>>()
            .cloned()
            .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("auth state extension missing")))?;
        require_admin(&parts.headers, &auth_state)
    }
}
