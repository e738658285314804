//! `GET /auth/session`: who am I.

use axum::{
    Json,
    extract::Extension,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::{AuthError, ErrorBody};
use super::principal::Principal;
use super::state::AuthState;
use super::types::SessionResponse;

#[utoipa::path(
    get,
    path = "/auth/session",
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    ),
    responses(
        (status = 200, description = "Access token is valid", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired access token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn session(principal: Principal, auth_state: Extension<Arc<AuthState>>) -> Response {
    match auth_state.store().find_user_by_id(principal.user_id).await {
        Ok(Some(user)) => Json(SessionResponse {
            user_id: user.id.to_string(),
            username: user.username,
            role: principal.role,
            expires_at: principal.expires_at,
        })
        .into_response(),
        // Signed for a user that no longer exists.
        Ok(None) => AuthError::TokenRevoked.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}
