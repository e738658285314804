//! `DELETE /auth/logout`.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;

use super::cookie::{clear_refresh_cookie, extract_refresh_cookie};
use super::revoker;
use super::state::AuthState;

#[utoipa::path(
    delete,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked (or nothing to revoke); refresh cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let presented = extract_refresh_cookie(&headers);
    revoker::logout(&auth_state, presented.as_deref()).await;

    // Always clear the cookie, even if there was no session to revoke.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_refresh_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::OK, response_headers)
}
