//! Refresh-token verification and single-use rotation.
//!
//! A presented token at generation N succeeds at most once: the store moves the
//! session to N+1 with a conditional update, so of any concurrent presenters of
//! N exactly one wins and the rest see `TokenSuperseded`.

use tracing::{instrument, warn};

use super::error::AuthError;
use super::issuer::IssuedSession;
use super::refresh_token::RefreshToken;
use super::state::AuthState;
use super::storage::SessionRotation;

/// Verify a refresh token and rotate it.
///
/// # Errors
/// - `TokenMalformed` for a missing, unparsable, unknown or forged token
/// - `TokenRevoked` after logout, or when the owning user is gone
/// - `TokenExpired` at or after the session expiry
/// - `TokenSuperseded` when the token's generation has already been rotated away
#[instrument(skip_all)]
pub async fn refresh(state: &AuthState, presented: Option<&str>) -> Result<IssuedSession, AuthError> {
    let presented = RefreshToken::parse(presented.ok_or(AuthError::TokenMalformed)?)?;
    let now = state.now_unix();

    let Some(session) = state.store().find_session(presented.session_id).await? else {
        return Err(AuthError::TokenMalformed);
    };
    if session.revoked {
        return Err(AuthError::TokenRevoked);
    }
    if now >= session.expires_at {
        return Err(AuthError::TokenExpired);
    }
    if presented.generation < session.generation {
        warn!(
            session_id = %session.id,
            presented = presented.generation,
            current = session.generation,
            "Stale refresh token presented"
        );
        return Err(AuthError::TokenSuperseded);
    }
    // A generation from the future, or the right generation with the wrong
    // secret, was never issued by us.
    if presented.generation > session.generation || presented.secret_hash() != session.secret_hash {
        return Err(AuthError::TokenMalformed);
    }

    let Some(user) = state.store().find_user_by_id(session.user_id).await? else {
        return Err(AuthError::TokenRevoked);
    };

    let config = state.config();
    let next = RefreshToken::generate(session.id, session.generation + 1)?;
    let rotated = state
        .store()
        .rotate_session(SessionRotation {
            session_id: session.id,
            expected_generation: session.generation,
            secret_hash: next.secret_hash(),
            rotated_at: now,
            expires_at: now + config.refresh_token_ttl_seconds(),
        })
        .await?;
    if !rotated {
        // Lost the race to a concurrent refresh, or a logout landed in between.
        return Err(AuthError::TokenSuperseded);
    }

    let access = state
        .signer()
        .sign(user.id, now, config.access_token_ttl_seconds())?;
    Ok(IssuedSession {
        access,
        refresh: next,
    })
}
