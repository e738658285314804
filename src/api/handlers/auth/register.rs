//! `POST /auth/register`.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::ErrorBody;
use super::issuer;
use super::login::{issued_response, read_credentials};
use super::state::AuthState;
use super::types::{CredentialsRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Admin created and signed in; refresh cookie set", body = TokenResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 409, description = "Username already exists", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let request = match read_credentials(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match issuer::register(&auth_state, &request.username, &request.password).await {
        Ok(issued) => issued_response(&auth_state, &issued),
        Err(err) => err.into_response(),
    }
}
