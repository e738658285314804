//! Small helpers for credential validation and header parsing.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use regex::Regex;

use super::error::AuthError;

/// Normalize a username for lookup/uniqueness checks.
pub(super) fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Username format check on already-normalized input.
pub(super) fn valid_username(username_normalized: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9._@-]{1,64}$").is_ok_and(|regex| regex.is_match(username_normalized))
}

/// Validate a username/password pair and return the normalized username.
pub(super) fn validate_credentials(username: &str, password: &str) -> Result<String, AuthError> {
    let username = normalize_username(username);
    if username.is_empty() {
        return Err(AuthError::Validation("username is required".to_string()));
    }
    if !valid_username(&username) {
        return Err(AuthError::Validation(
            "username must be 1-64 characters of letters, digits, '.', '_', '@' or '-'"
                .to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("password is required".to_string()));
    }
    Ok(username)
}

/// Postgres unique constraint violation (SQLSTATE 23505).
pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
