//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::access_token::Role;

#[derive(ToSchema, Serialize, Deserialize, Clone, Default)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Access token issued by register, login and refresh.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

impl TokenResponse {
    #[must_use]
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    /// Unix seconds at which the presented access token stops being accepted.
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn token_response_uses_camel_case() -> Result<()> {
        let value = serde_json::to_value(TokenResponse::bearer("abc".to_string(), 900))?;
        let token = value
            .get("accessToken")
            .and_then(serde_json::Value::as_str)
            .context("missing accessToken")?;
        assert_eq!(token, "abc");
        assert_eq!(value.get("tokenType"), Some(&serde_json::json!("Bearer")));
        assert_eq!(value.get("expiresIn"), Some(&serde_json::json!(900)));
        Ok(())
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let request = CredentialsRequest {
            username: "alice".to_string(),
            password: "secret1".to_string(),
        };
        let debug = format!("{request:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret1"));
    }

    #[test]
    fn session_response_serializes_role() -> Result<()> {
        let value = serde_json::to_value(SessionResponse {
            user_id: "id".to_string(),
            username: "alice".to_string(),
            role: Role::Admin,
            expires_at: 10,
        })?;
        assert_eq!(value.get("role"), Some(&serde_json::json!("admin")));
        assert_eq!(value.get("userId"), Some(&serde_json::json!("id")));
        Ok(())
    }
}
