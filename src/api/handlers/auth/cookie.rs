//! The refresh-token cookie.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

use super::state::AuthConfig;

pub const REFRESH_COOKIE_NAME: &str = "merapi_refresh";

/// Build an `HttpOnly` `SameSite=Strict` cookie carrying the refresh token.
pub(super) fn refresh_cookie(
    config: &AuthConfig,
    value: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.refresh_token_ttl_seconds();
    // Scoped to the auth routes; resource handlers never see the refresh token.
    let path = config.refresh_cookie_path();
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={value}; Path={path}; HttpOnly; SameSite=Strict; Max-Age={ttl_seconds}"
    );
    if config.refresh_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_refresh_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let path = config.refresh_cookie_path();
    let mut cookie =
        format!("{REFRESH_COOKIE_NAME}=; Path={path}; HttpOnly; SameSite=Strict; Max-Age=0");
    if config.refresh_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == REFRESH_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;

    fn config(base: &str) -> AuthConfig {
        AuthConfig::new(base.to_string(), SecretString::from("k".repeat(32)))
    }

    #[test]
    fn cookie_attributes() -> Result<()> {
        let value = refresh_cookie(&config("https://admin.example.com"), "abc")?;
        let value = value.to_str()?;
        assert!(value.starts_with("merapi_refresh=abc;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Strict"));
        assert!(value.contains("; Path=/auth;"));
        assert!(value.contains("Max-Age=604800"));
        assert!(value.ends_with("; Secure"));

        let plain = refresh_cookie(&config("http://localhost:3000"), "abc")?;
        assert!(!plain.to_str()?.contains("Secure"));
        Ok(())
    }

    #[test]
    fn cookie_path_follows_public_base_path() -> Result<()> {
        let prefixed = config("http://localhost:3000").with_public_base_path("/v1");
        let set = refresh_cookie(&prefixed, "abc")?;
        assert!(set.to_str()?.contains("; Path=/v1/auth;"));
        let cleared = clear_refresh_cookie(&prefixed)?;
        assert!(cleared.to_str()?.contains("; Path=/v1/auth;"));
        Ok(())
    }

    #[test]
    fn cleared_cookie_expires_immediately() -> Result<()> {
        let value = clear_refresh_cookie(&config("http://localhost:3000"))?;
        assert!(value.to_str()?.starts_with("merapi_refresh=;"));
        assert!(value.to_str()?.contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn extract_finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; merapi_refresh=abc.0.xyz; lang=id"),
        );
        assert_eq!(extract_refresh_cookie(&headers).as_deref(), Some("abc.0.xyz"));
    }

    #[test]
    fn extract_ignores_empty_and_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_refresh_cookie(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("merapi_refresh="));
        assert_eq!(extract_refresh_cookie(&headers), None);
    }
}
