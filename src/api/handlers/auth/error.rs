//! Closed error taxonomy for the auth protocol and its wire mapping.
//!
//! Handlers never branch on status codes; they return an [`AuthError`] and the
//! `IntoResponse` impl below picks the status and the machine-readable code.
//! Clients decode the code back into an [`ErrorCode`] and match on that.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Machine-readable error identity carried in every error body.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    InvalidCredential,
    AlreadyExists,
    TokenExpired,
    TokenRevoked,
    TokenSuperseded,
    TokenMalformed,
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::InvalidCredential => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::TokenExpired | Self::TokenRevoked | Self::TokenSuperseded | Self::TokenMalformed => {
                StatusCode::UNAUTHORIZED
            }
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Token-side failures. The guard collapses all of these into "log in again".
    #[must_use]
    pub const fn is_unauthenticated(self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::TokenRevoked | Self::TokenSuperseded | Self::TokenMalformed
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::InvalidCredential => "invalid_credential",
            Self::AlreadyExists => "already_exists",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::TokenSuperseded => "token_superseded",
            Self::TokenMalformed => "token_malformed",
            Self::Internal => "internal",
        }
    }
}

/// JSON body returned with every non-2xx auth response.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("username not found")]
    NotFound,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("username already exists")]
    AlreadyExists,
    #[error("token expired")]
    TokenExpired,
    #[error("token revoked")]
    TokenRevoked,
    #[error("token superseded")]
    TokenSuperseded,
    #[error("token malformed")]
    TokenMalformed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::NotFound => ErrorCode::NotFound,
            Self::InvalidCredential => ErrorCode::InvalidCredential,
            Self::AlreadyExists => ErrorCode::AlreadyExists,
            Self::TokenExpired => ErrorCode::TokenExpired,
            Self::TokenRevoked => ErrorCode::TokenRevoked,
            Self::TokenSuperseded => ErrorCode::TokenSuperseded,
            Self::TokenMalformed => ErrorCode::TokenMalformed,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    fn body(&self) -> ErrorBody {
        let message = match self {
            // Store and crypto failures stay in the logs.
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            error: self.code(),
            message,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Auth operation failed: {err:#}");
        }
        let code = self.code();
        (code.status(), Json(self.body())).into_response()
    }
}
