//! `POST /auth/login`.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::cookie::refresh_cookie;
use super::error::{AuthError, ErrorBody};
use super::issuer::{self, IssuedSession};
use super::state::AuthState;
use super::types::{CredentialsRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Authenticated; refresh cookie set", body = TokenResponse),
        (status = 400, description = "Validation error or wrong password", body = ErrorBody),
        (status = 404, description = "Unknown username", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let request = match read_credentials(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match issuer::login(&auth_state, &request.username, &request.password).await {
        Ok(issued) => issued_response(&auth_state, &issued),
        Err(err) => err.into_response(),
    }
}

pub(super) fn read_credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, AuthError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| AuthError::Validation(rejection.body_text()))
}

/// 200 with the access token in the body and the refresh token in the cookie.
pub(super) fn issued_response(auth_state: &AuthState, issued: &IssuedSession) -> Response {
    let cookie = match refresh_cookie(auth_state.config(), &issued.refresh.encode()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build refresh cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    let body = TokenResponse::bearer(issued.access.token.clone(), issued.access.expires_in());
    (StatusCode::OK, headers, Json(body)).into_response()
}
