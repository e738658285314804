//! `GET /auth/token`: trade the refresh cookie for a new token pair.

use axum::{
    extract::Extension,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::cookie::{clear_refresh_cookie, extract_refresh_cookie};
use super::error::{AuthError, ErrorBody};
use super::login::issued_response;
use super::rotation;
use super::state::AuthState;
use super::types::TokenResponse;

#[utoipa::path(
    get,
    path = "/auth/token",
    responses(
        (status = 200, description = "Session rotated; new refresh cookie set", body = TokenResponse),
        (status = 401, description = "Refresh token missing, malformed, expired, revoked or superseded", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn token(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let presented = extract_refresh_cookie(&headers);
    match rotation::refresh(&auth_state, presented.as_deref()).await {
        Ok(issued) => issued_response(&auth_state, &issued),
        Err(err) => {
            let clear = clears_cookie(&err);
            let mut response = err.into_response();
            if clear {
                if let Ok(cookie) = clear_refresh_cookie(auth_state.config()) {
                    response.headers_mut().insert(SET_COOKIE, cookie);
                }
            }
            response
        }
    }
}

// A superseded presenter may share its cookie jar with the concurrent winner,
// whose freshly rotated cookie must survive.
fn clears_cookie(err: &AuthError) -> bool {
    matches!(
        err,
        AuthError::TokenExpired | AuthError::TokenRevoked | AuthError::TokenMalformed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superseded_keeps_cookie() {
        assert!(!clears_cookie(&AuthError::TokenSuperseded));
        assert!(clears_cookie(&AuthError::TokenExpired));
        assert!(clears_cookie(&AuthError::TokenRevoked));
        assert!(clears_cookie(&AuthError::TokenMalformed));
    }
}
