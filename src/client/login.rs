//! Login page flow and logout.

use std::sync::Arc;
use tracing::{info, warn};

use super::api::AuthApi;
use super::errors::{AuthFailure, ClientError};
use crate::api::handlers::auth::ErrorCode;
use super::guard::{Guard, GuardOptions, Navigation};
use super::session::Session;

/// Result of opening the login page.
#[derive(Debug)]
pub enum LoginResume {
    /// The refresh cookie is still good; skip the form.
    AlreadySignedIn { session: Session, redirect_to: String },
    ShowForm,
}

pub struct LoginFlow {
    api: Arc<dyn AuthApi>,
    guard: Guard,
    dashboard_path: String,
}

impl std::fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow")
            .field("dashboard_path", &self.dashboard_path)
            .finish_non_exhaustive()
    }
}

impl LoginFlow {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, options: GuardOptions, dashboard_path: String) -> Self {
        Self {
            guard: Guard::new(Arc::clone(&api), options),
            api,
            dashboard_path,
        }
    }

    /// Check for a live session before showing the form. Without a local
    /// session no request is made.
    pub async fn resume(&mut self, session: Option<Session>) -> LoginResume {
        match self.guard.enter(session).await {
            Navigation::Render(session) => LoginResume::AlreadySignedIn {
                session,
                redirect_to: self.dashboard_path.clone(),
            },
            Navigation::Redirect(_) => LoginResume::ShowForm,
        }
    }

    /// Submit the login form. Blank fields fail locally with a `Validation`
    /// code and no request is made.
    ///
    /// # Errors
    /// Returns the API error; `ClientError::user_message` gives the form text
    /// ("Username not found", "Wrong password", ...).
    pub async fn submit(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        require_fields(username, password)?;
        let session = self.api.login(username, password).await?;
        info!("Signed in");
        Ok(session)
    }

    /// # Errors
    /// Returns the API error, e.g. `AlreadyExists` for a taken username.
    pub async fn register(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        require_fields(username, password)?;
        self.api.register(username, password).await
    }

    #[must_use]
    pub fn dashboard_path(&self) -> &str {
        &self.dashboard_path
    }
}

fn require_fields(username: &str, password: &str) -> Result<(), ClientError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(ClientError::Auth(AuthFailure {
            code: ErrorCode::Validation,
            message: "username and password are required".to_string(),
        }));
    }
    Ok(())
}

/// Sign out. The local session is consumed whatever the server says and
/// server errors are only logged.
pub async fn logout(api: &dyn AuthApi, session: Option<Session>) {
    drop(session);
    if let Err(err) = api.logout().await {
        warn!("Logout request failed, local session cleared anyway: {err}");
    }
}
