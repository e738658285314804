//! HTTP client for the auth endpoints.
//!
//! The refresh token never passes through this code: it lives in the client's
//! cookie jar and travels only as the `HttpOnly` cookie the server sets.

use async_trait::async_trait;
use reqwest::{Client, Response, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span};

use crate::APP_USER_AGENT;
use crate::api::handlers::auth::{CredentialsRequest, SessionResponse, TokenResponse};

use super::config::ClientConfig;
use super::errors::ClientError;
use super::session::Session;

/// Operations the guard and login flow need from the server.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, username: &str, password: &str) -> Result<Session, ClientError>;

    async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError>;

    /// Rotate the refresh cookie and obtain a new access token.
    async fn refresh(&self) -> Result<Session, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;

    /// Ask the server who the access token belongs to.
    async fn whoami(&self, session: &Session) -> Result<SessionResponse, ClientError>;
}

#[derive(Clone, Debug)]
pub struct HttpAuthClient {
    http: Client,
    config: ClientConfig,
}

impl HttpAuthClient {
    /// # Errors
    /// Returns `ClientError::Config` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_credentials(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let url = self.config.endpoint(path)?;
        let request = CredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .instrument(info_span!("http.client", http.method = "POST", http.route = path))
            .await?;
        let token: TokenResponse = decode(response).await?;
        Session::from_token_response(token)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Parse(err.to_string()));
    }
    let body = response.bytes().await.unwrap_or_default();
    let err = ClientError::from_response(status.as_u16(), &body);
    debug!("Auth request failed: {err}");
    Err(err)
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    async fn register(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        self.send_credentials("/auth/register", username, password)
            .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        self.send_credentials("/auth/login", username, password).await
    }

    async fn refresh(&self) -> Result<Session, ClientError> {
        let url = self.config.endpoint("/auth/token")?;
        let response = self
            .http
            .get(url)
            .send()
            .instrument(info_span!("http.client", http.method = "GET", http.route = "/auth/token"))
            .await?;
        let token: TokenResponse = decode(response).await?;
        Session::from_token_response(token)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let url = self.config.endpoint("/auth/logout")?;
        let response = self
            .http
            .delete(url)
            .send()
            .instrument(info_span!("http.client", http.method = "DELETE", http.route = "/auth/logout"))
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap_or_default();
        Err(ClientError::from_response(status, &body))
    }

    async fn whoami(&self, session: &Session) -> Result<SessionResponse, ClientError> {
        let url = self.config.endpoint("/auth/session")?;
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, session.bearer())
            .send()
            .instrument(info_span!("http.client", http.method = "GET", http.route = "/auth/session"))
            .await?;
        decode(response).await
    }
}
