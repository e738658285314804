//! Token issuance for register and login.

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::access_token::AccessToken;
use super::error::AuthError;
use super::password::{hash_password, verify_password};
use super::refresh_token::RefreshToken;
use super::state::AuthState;
use super::storage::{InsertUserOutcome, NewSession, UserRecord};
use super::utils::validate_credentials;

/// Token pair handed out by a successful register, login or refresh.
#[derive(Debug)]
pub struct IssuedSession {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

/// Create an admin credential and open its first session.
///
/// # Errors
/// `Validation` on bad input, `AlreadyExists` when the username is taken.
#[instrument(skip(state, password))]
pub async fn register(
    state: &AuthState,
    username: &str,
    password: &str,
) -> Result<IssuedSession, AuthError> {
    let username = validate_credentials(username, password)?;
    let password_hash = hash_password(password.to_string()).await?;

    let user = match state.store().insert_user(&username, &password_hash).await? {
        InsertUserOutcome::Created(user) => user,
        InsertUserOutcome::Conflict => return Err(AuthError::AlreadyExists),
    };
    info!(user_id = %user.id, "Admin registered");
    issue_session(state, &user).await
}

/// Authenticate a credential and open a new session.
///
/// # Errors
/// `Validation` on bad input, `NotFound` for an unknown username,
/// `InvalidCredential` on password mismatch.
#[instrument(skip(state, password))]
pub async fn login(
    state: &AuthState,
    username: &str,
    password: &str,
) -> Result<IssuedSession, AuthError> {
    let username = validate_credentials(username, password)?;
    let Some(user) = state.store().find_user_by_username(&username).await? else {
        return Err(AuthError::NotFound);
    };
    if !verify_password(password.to_string(), user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredential);
    }
    info!(user_id = %user.id, "Admin logged in");
    issue_session(state, &user).await
}

/// Persist a generation-0 session and mint the matching access token.
///
/// Expired sessions are pruned first; a failed prune is logged and does not
/// block the login.
pub(super) async fn issue_session(
    state: &AuthState,
    user: &UserRecord,
) -> Result<IssuedSession, AuthError> {
    let now = state.now_unix();
    let config = state.config();
    let refresh = RefreshToken::generate(Uuid::now_v7(), 0)?;

    match state.store().purge_sessions(now).await {
        Ok(0) => {}
        Ok(purged) => debug!(purged, "Purged expired sessions"),
        Err(err) => warn!("Failed to purge expired sessions: {err:#}"),
    }

    state
        .store()
        .insert_session(NewSession {
            id: refresh.session_id,
            user_id: user.id,
            secret_hash: refresh.secret_hash(),
            issued_at: now,
            expires_at: now + config.refresh_token_ttl_seconds(),
        })
        .await?;

    let access = state
        .signer()
        .sign(user.id, now, config.access_token_ttl_seconds())?;
    Ok(IssuedSession { access, refresh })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{
        clock::{Clock, ManualClock, SystemClock},
        memory_store::MemoryAuthStore,
        state::AuthConfig,
        storage::AuthStore,
    };
    use anyhow::Result;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn state() -> Result<(AuthState, Arc<MemoryAuthStore>)> {
        clocked_state(Arc::new(SystemClock))
    }

    fn clocked_state(clock: Arc<dyn Clock>) -> Result<(AuthState, Arc<MemoryAuthStore>)> {
        let store = Arc::new(MemoryAuthStore::new());
        let config = AuthConfig::new(
            "http://localhost:3000".to_string(),
            SecretString::from("k".repeat(32)),
        );
        Ok((AuthState::new(config, store.clone())?.with_clock(clock), store))
    }

    #[tokio::test]
    async fn register_then_login() -> Result<()> {
        let (state, store) = state()?;
        let registered = register(&state, " alice ", "secret1").await?;
        assert_eq!(registered.refresh.generation, 0);

        let user = store.find_user_by_username("alice").await?;
        assert!(user.is_some_and(|u| u.password_hash.starts_with("$argon2id$")));

        let logged_in = login(&state, "alice", "secret1").await?;
        assert_ne!(logged_in.access.token, registered.access.token);
        assert_ne!(logged_in.refresh.session_id, registered.refresh.session_id);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_register_is_already_exists() -> Result<()> {
        let (state, _) = state()?;
        register(&state, "alice", "secret1").await?;
        assert!(matches!(
            register(&state, "alice", "other").await,
            Err(AuthError::AlreadyExists)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn login_failures_are_distinguished() -> Result<()> {
        let (state, _) = state()?;
        register(&state, "alice", "secret1").await?;
        assert!(matches!(
            login(&state, "alice", "wrong").await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            login(&state, "bob", "x").await,
            Err(AuthError::NotFound)
        ));
        assert!(matches!(
            login(&state, "", "x").await,
            Err(AuthError::Validation(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn issued_session_is_persisted_at_generation_zero() -> Result<()> {
        let (state, store) = state()?;
        let issued = register(&state, "alice", "secret1").await?;
        let session = store.find_session(issued.refresh.session_id).await?;
        let session = session.ok_or_else(|| anyhow::anyhow!("session missing"))?;
        assert_eq!(session.generation, 0);
        assert_eq!(session.secret_hash, issued.refresh.secret_hash());
        assert!(!session.revoked);
        assert_eq!(
            session.expires_at - session.issued_at,
            state.config().refresh_token_ttl_seconds()
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_prunes_expired_sessions() -> Result<()> {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let (state, store) = clocked_state(clock.clone())?;
        let first = register(&state, "alice", "secret1").await?;
        login(&state, "alice", "secret1").await?;
        assert_eq!(store.session_count().await, 2);

        clock.advance(state.config().refresh_token_ttl_seconds());
        let fresh = login(&state, "alice", "secret1").await?;
        assert_eq!(store.session_count().await, 1);
        assert!(store.find_session(first.refresh.session_id).await?.is_none());
        assert!(store.find_session(fresh.refresh.session_id).await?.is_some());
        Ok(())
    }
}
