//! Protected-route guard.
//!
//! Every entry into an admin view runs a small state machine:
//!
//! ```text
//! Init ──no session──────────────────────────▶ Unauthenticated ─▶ redirect to login
//!   │
//!   └─session──▶ Verifying ──refresh ok──▶ Authenticated ─▶ render
//!                   │
//!                   └─any failure / timeout─▶ Unauthenticated ─▶ redirect to login
//! ```
//!
//! The refresh runs on its own task, so dropping the guard mid-verification
//! lets the request finish (and the rotated cookie land in the jar) while its
//! result is discarded. Guards created with [`Guard::fork`] share one in-flight
//! refresh: concurrent entries cost a single round-trip and a failure yields
//! one shared outcome instead of a burst of superseded refreshes.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::api::AuthApi;
use super::config::ClientConfig;
use super::errors::ClientError;
use super::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Init,
    Verifying,
    Authenticated,
    Unauthenticated,
}

/// What the view layer should do after the guard ran.
#[derive(Debug)]
pub enum Navigation {
    /// Render the protected subtree with this (possibly renewed) session.
    Render(Session),
    /// Go to the login page. No retry.
    Redirect(String),
}

impl Navigation {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

type RefreshResult = Result<Session, ClientError>;

/// Single-flight wrapper around `AuthApi::refresh`.
#[derive(Default)]
struct RefreshGate {
    inflight: Mutex<Option<broadcast::Sender<RefreshResult>>>,
}

impl RefreshGate {
    fn subscribe(self: &Arc<Self>, api: &Arc<dyn AuthApi>) -> broadcast::Receiver<RefreshResult> {
        let mut inflight = match self.inflight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(sender) = inflight.as_ref() {
            return sender.subscribe();
        }

        let (sender, receiver) = broadcast::channel(1);
        *inflight = Some(sender.clone());
        drop(inflight);

        let gate = Arc::clone(self);
        let api = Arc::clone(api);
        tokio::spawn(async move {
            let result = api.refresh().await;
            let mut inflight = match gate.inflight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            inflight.take();
            drop(inflight);
            // Nobody listening means every guard went away; the result is discarded.
            let _ = sender.send(result);
        });
        receiver
    }
}

#[derive(Clone, Debug)]
pub struct GuardOptions {
    pub login_path: String,
    pub refresh_timeout: Duration,
    pub session_cache_margin: Option<Duration>,
}

impl From<&ClientConfig> for GuardOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            refresh_timeout: config.refresh_timeout,
            session_cache_margin: config.session_cache_margin,
        }
    }
}

pub struct Guard {
    api: Arc<dyn AuthApi>,
    gate: Arc<RefreshGate>,
    options: GuardOptions,
    state: GuardState,
    transitions: Vec<GuardState>,
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Guard {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, options: GuardOptions) -> Self {
        Self {
            api,
            gate: Arc::new(RefreshGate::default()),
            options,
            state: GuardState::Init,
            transitions: vec![GuardState::Init],
        }
    }

    /// A fresh guard that shares this one's API client and in-flight refresh.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            gate: Arc::clone(&self.gate),
            options: self.options.clone(),
            state: GuardState::Init,
            transitions: vec![GuardState::Init],
        }
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Every state visited since the last reset, starting with `Init`.
    #[must_use]
    pub fn transitions(&self) -> &[GuardState] {
        &self.transitions
    }

    fn transition(&mut self, next: GuardState) {
        debug!(from = ?self.state, to = ?next, "Guard transition");
        self.state = next;
        self.transitions.push(next);
    }

    fn reset(&mut self) {
        self.state = GuardState::Init;
        self.transitions.clear();
        self.transitions.push(GuardState::Init);
    }

    fn redirect(&mut self) -> Navigation {
        self.transition(GuardState::Unauthenticated);
        Navigation::Redirect(self.options.login_path.clone())
    }

    /// Run the guard for one entry into a protected view.
    ///
    /// Takes the session by value: on success the renewed session comes back
    /// inside `Navigation::Render`, on failure it is dropped.
    pub async fn enter(&mut self, session: Option<Session>) -> Navigation {
        self.reset();

        let Some(session) = session else {
            return self.redirect();
        };

        if let Some(margin) = self.options.session_cache_margin {
            if session.is_fresh(margin) {
                self.transition(GuardState::Authenticated);
                return Navigation::Render(session);
            }
        }

        self.transition(GuardState::Verifying);
        drop(session);

        match self.verify().await {
            Ok(renewed) => {
                self.transition(GuardState::Authenticated);
                Navigation::Render(renewed)
            }
            Err(err) => {
                debug!("Session verification failed: {err}");
                self.redirect()
            }
        }
    }

    async fn verify(&self) -> RefreshResult {
        let mut receiver = self.gate.subscribe(&self.api);
        match tokio::time::timeout(self.options.refresh_timeout, receiver.recv()).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(ClientError::Network(format!("refresh task ended: {err}"))),
            Err(_) => {
                warn!(
                    "Session refresh timed out after {:?}",
                    self.options.refresh_timeout
                );
                Err(ClientError::Timeout("session refresh".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{ErrorCode, SessionResponse};
    use crate::client::errors::AuthFailure;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeApi {
        refreshes: AtomicUsize,
        completed: AtomicUsize,
        delay: Duration,
        fail_with: Option<ErrorCode>,
    }

    impl FakeApi {
        fn ok() -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_with: None,
            }
        }

        fn calls(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthApi for FakeApi {
        async fn register(&self, _: &str, _: &str) -> Result<Session, ClientError> {
            Err(ClientError::Config("unused".to_string()))
        }

        async fn login(&self, _: &str, _: &str) -> Result<Session, ClientError> {
            Err(ClientError::Config("unused".to_string()))
        }

        async fn refresh(&self) -> Result<Session, ClientError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(code) => Err(ClientError::Auth(AuthFailure {
                    code,
                    message: code.as_str().to_string(),
                })),
                None => Ok(session("renewed", 900)),
            }
        }

        async fn logout(&self) -> Result<(), ClientError> {
            Ok(())
        }

        async fn whoami(&self, _: &Session) -> Result<SessionResponse, ClientError> {
            Err(ClientError::Config("unused".to_string()))
        }
    }

    fn session(token: &str, seconds: u64) -> Session {
        Session::new(
            SecretString::from(token.to_string()),
            Duration::from_secs(seconds),
        )
    }

    fn options() -> GuardOptions {
        GuardOptions {
            login_path: "/admin/login".to_string(),
            refresh_timeout: Duration::from_millis(200),
            session_cache_margin: None,
        }
    }

    #[tokio::test]
    async fn no_session_redirects_without_network() {
        let api = Arc::new(FakeApi::ok());
        let mut guard = Guard::new(api.clone(), options());
        let navigation = guard.enter(None).await;
        assert!(matches!(navigation, Navigation::Redirect(ref path) if path == "/admin/login"));
        assert_eq!(
            guard.transitions(),
            &[GuardState::Init, GuardState::Unauthenticated]
        );
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn successful_refresh_renders_with_new_session() {
        let api = Arc::new(FakeApi::ok());
        let mut guard = Guard::new(api.clone(), options());
        let navigation = guard.enter(Some(session("old", 900))).await;
        match navigation {
            Navigation::Render(renewed) => assert_eq!(renewed.access_token(), "renewed"),
            Navigation::Redirect(_) => panic!("expected render"),
        }
        assert_eq!(
            guard.transitions(),
            &[
                GuardState::Init,
                GuardState::Verifying,
                GuardState::Authenticated
            ]
        );
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn every_refresh_failure_collapses_to_unauthenticated() {
        for code in [
            ErrorCode::TokenExpired,
            ErrorCode::TokenRevoked,
            ErrorCode::TokenSuperseded,
            ErrorCode::TokenMalformed,
            ErrorCode::Internal,
        ] {
            let api = Arc::new(FakeApi {
                fail_with: Some(code),
                ..FakeApi::ok()
            });
            let mut guard = Guard::new(api, options());
            assert!(!guard.enter(Some(session("old", 900))).await.is_render());
            assert_eq!(guard.state(), GuardState::Unauthenticated);
        }
    }

    #[tokio::test]
    async fn slow_refresh_times_out() {
        let api = Arc::new(FakeApi {
            delay: Duration::from_secs(5),
            ..FakeApi::ok()
        });
        let mut guard = Guard::new(api, options());
        assert!(!guard.enter(Some(session("old", 900))).await.is_render());
        assert_eq!(guard.state(), GuardState::Unauthenticated);
    }

    #[tokio::test]
    async fn fresh_cached_session_skips_network() {
        let api = Arc::new(FakeApi::ok());
        let mut guard = Guard::new(
            api.clone(),
            GuardOptions {
                session_cache_margin: Some(Duration::from_secs(60)),
                ..options()
            },
        );
        assert!(guard.enter(Some(session("cached", 900))).await.is_render());
        assert_eq!(api.calls(), 0);

        // Inside the margin the guard goes back to the server.
        assert!(guard.enter(Some(session("stale", 30))).await.is_render());
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn forked_guards_share_one_refresh() {
        let api = Arc::new(FakeApi {
            delay: Duration::from_millis(50),
            ..FakeApi::ok()
        });
        let mut first = Guard::new(api.clone(), options());
        let mut second = first.fork();
        let (a, b) = tokio::join!(
            first.enter(Some(session("old", 900))),
            second.enter(Some(session("old", 900)))
        );
        assert!(a.is_render() && b.is_render());
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn dropped_guard_lets_refresh_finish() {
        let api = Arc::new(FakeApi {
            delay: Duration::from_millis(50),
            ..FakeApi::ok()
        });
        let mut guard = Guard::new(api.clone(), options());
        let entry = tokio::time::timeout(
            Duration::from_millis(10),
            guard.enter(Some(session("old", 900))),
        )
        .await;
        assert!(entry.is_err());
        drop(guard);

        assert_eq!(api.completed.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(api.completed.load(Ordering::SeqCst), 1);
    }
}
