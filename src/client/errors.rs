use crate::api::handlers::auth::{ErrorBody, ErrorCode};

/// A failure reported by the auth API with its machine-readable code.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl AuthFailure {
    /// Text for the login form.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self.code {
            ErrorCode::NotFound => "Username not found",
            ErrorCode::InvalidCredential => "Wrong password",
            ErrorCode::AlreadyExists => "Username already taken",
            ErrorCode::Validation => "Username and password are required",
            _ => "Something went wrong, please try again",
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error(transparent)]
    Auth(AuthFailure),
}

impl ClientError {
    /// Decode a non-2xx response. The body's error code wins; the status is
    /// only consulted when the body is unreadable.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if let Ok(decoded) = serde_json::from_slice::<ErrorBody>(body) {
            return Self::Auth(AuthFailure {
                code: decoded.error,
                message: decoded.message,
            });
        }
        let message = String::from_utf8_lossy(body).trim().to_string();
        let code = match status {
            401 => Some(ErrorCode::TokenMalformed),
            404 => Some(ErrorCode::NotFound),
            409 => Some(ErrorCode::AlreadyExists),
            _ => None,
        };
        match code {
            Some(code) => Self::Auth(AuthFailure { code, message }),
            None => Self::Http { status, message },
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Auth(failure) => Some(failure.code),
            _ => None,
        }
    }

    /// Text for the login form.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Auth(failure) => failure.user_message(),
            Self::Network(_) | Self::Timeout(_) => "Unable to reach the server",
            _ => "Something went wrong, please try again",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
