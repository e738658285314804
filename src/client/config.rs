//! Client configuration.
//!
//! Values come from `MERAPI_*` environment variables with code defaults.
//! Configuration is public; never put secrets here.

use std::time::Duration;
use url::Url;

use super::errors::ClientError;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOGIN_PATH: &str = "/admin/login";
const DEFAULT_DASHBOARD_PATH: &str = "/admin";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: Url,
    /// Upper bound for any single HTTP request.
    pub request_timeout: Duration,
    /// Upper bound for the guard's refresh round-trip.
    pub refresh_timeout: Duration,
    pub login_path: String,
    pub dashboard_path: String,
    /// When set, the guard trusts an access token that stays valid for at
    /// least this long and skips the refresh call.
    pub session_cache_margin: Option<Duration>,
}

impl ClientConfig {
    /// # Errors
    /// Returns `ClientError::Config` when the base URL does not parse or is not http(s).
    pub fn new(api_base_url: &str) -> Result<Self, ClientError> {
        let mut api_base_url = Url::parse(api_base_url.trim())
            .map_err(|err| ClientError::Config(format!("invalid API base URL: {err}")))?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "API base URL must be http or https: {api_base_url}"
            )));
        }
        // Url::join drops the last segment unless the path ends in a slash.
        if !api_base_url.path().ends_with('/') {
            let path = format!("{}/", api_base_url.path());
            api_base_url.set_path(&path);
        }
        Ok(Self {
            api_base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
            session_cache_margin: None,
        })
    }

    /// Load from `MERAPI_API_BASE_URL` and the optional
    /// `MERAPI_REFRESH_TIMEOUT_SECONDS` / `MERAPI_SESSION_CACHE_SECONDS`.
    ///
    /// # Errors
    /// Returns `ClientError::Config` when the base URL is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        let base = std::env::var("MERAPI_API_BASE_URL")
            .map_err(|_| ClientError::Config("MERAPI_API_BASE_URL is not set".to_string()))?;
        let mut config = Self::new(&base)?;
        if let Some(seconds) = env_seconds("MERAPI_REFRESH_TIMEOUT_SECONDS")? {
            if seconds.is_zero() {
                return Err(ClientError::Config(
                    "MERAPI_REFRESH_TIMEOUT_SECONDS must be greater than zero".to_string(),
                ));
            }
            config.refresh_timeout = seconds;
        }
        config.session_cache_margin = env_seconds("MERAPI_SESSION_CACHE_SECONDS")?;
        Ok(config)
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_session_cache_margin(mut self, margin: Option<Duration>) -> Self {
        self.session_cache_margin = margin;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Resolve an API path against the base URL.
    ///
    /// # Errors
    /// Returns `ClientError::Config` if the join fails.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.api_base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::Config(format!("invalid endpoint {path}: {err}")))
    }
}

fn env_seconds(name: &str) -> Result<Option<Duration>, ClientError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|seconds| Some(Duration::from_secs(seconds)))
            .map_err(|_| ClientError::Config(format!("{name} must be a whole number of seconds"))),
        Err(_) => Ok(None),
    }
}
