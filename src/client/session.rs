//! The client's in-memory access token.

use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};

use crate::api::handlers::auth::TokenResponse;

use super::errors::ClientError;

/// An access token held by the client.
///
/// Created on login, register or refresh success and passed by value through
/// the guard; it is dropped on logout or any authentication failure.
#[derive(Clone)]
pub struct Session {
    access_token: SecretString,
    expires_at: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(access_token: SecretString, expires_in: Duration) -> Self {
        Self {
            access_token,
            expires_at: Instant::now() + expires_in,
        }
    }

    /// # Errors
    /// Returns `ClientError::Parse` for a non-bearer or already-expired token.
    pub fn from_token_response(response: TokenResponse) -> Result<Self, ClientError> {
        if !response.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ClientError::Parse(format!(
                "unexpected token type: {}",
                response.token_type
            )));
        }
        let expires_in = u64::try_from(response.expires_in)
            .ok()
            .filter(|seconds| *seconds > 0)
            .ok_or_else(|| ClientError::Parse("access token lifetime must be positive".to_string()))?;
        Ok(Self::new(
            SecretString::from(response.access_token),
            Duration::from_secs(expires_in),
        ))
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// True while the token stays valid for at least `margin` more.
    #[must_use]
    pub fn is_fresh(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}
