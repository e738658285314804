//! Auth configuration and the shared state handed to every handler.

use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::access_token::AccessTokenSigner;
use super::clock::{Clock, SystemClock};
use super::storage::AuthStore;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Check the TTL relationship every token pair depends on.
///
/// # Errors
/// Fails when either TTL is not positive or the access TTL is not strictly
/// shorter than the refresh TTL.
pub fn validate_ttls(access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Result<()> {
    if access_ttl_seconds <= 0 {
        bail!("access token TTL must be positive, got {access_ttl_seconds}");
    }
    if refresh_ttl_seconds <= 0 {
        bail!("refresh token TTL must be positive, got {refresh_ttl_seconds}");
    }
    if access_ttl_seconds >= refresh_ttl_seconds {
        bail!(
            "access token TTL ({access_ttl_seconds}s) must be shorter than refresh token TTL ({refresh_ttl_seconds}s)"
        );
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    token_secret: SecretString,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    public_base_path: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, token_secret: SecretString) -> Self {
        Self {
            frontend_base_url,
            token_secret,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            public_base_path: String::new(),
        }
    }

    /// Prefix the API is mounted under by a proxy or an outer router, e.g.
    /// `/v1`. Stored with a leading slash and without a trailing one; `/`
    /// and the empty string both mean the root.
    #[must_use]
    pub fn with_public_base_path(mut self, path: &str) -> Self {
        let trimmed = path.trim().trim_matches('/');
        self.public_base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    /// # Errors
    /// Fails on a short signing secret or an invalid TTL pair.
    pub fn validate(&self) -> Result<()> {
        let secret_len = self.token_secret.expose_secret().len();
        if secret_len < MIN_TOKEN_SECRET_BYTES {
            bail!(
                "token secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes, got {secret_len}"
            );
        }
        validate_ttls(self.access_token_ttl_seconds, self.refresh_token_ttl_seconds)
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    #[must_use]
    pub fn public_base_path(&self) -> &str {
        &self.public_base_path
    }

    /// Cookie `Path` covering the auth routes as the browser sees them.
    pub(super) fn refresh_cookie_path(&self) -> String {
        format!("{}/auth", self.public_base_path)
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(super) fn refresh_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    signer: AccessTokenSigner,
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// # Errors
    /// Fails when the configuration does not validate.
    pub fn new(config: AuthConfig, store: Arc<dyn AuthStore>) -> Result<Self> {
        config.validate()?;
        let signer = AccessTokenSigner::new(config.token_secret.clone());
        Ok(Self {
            config,
            signer,
            store,
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn signer(&self) -> &AccessTokenSigner {
        &self.signer
    }

    pub(crate) fn store(&self) -> &dyn AuthStore {
        self.store.as_ref()
    }

    pub(crate) fn now_unix(&self) -> i64 {
        self.clock.now_unix()
    }
}
