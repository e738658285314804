//! Session revocation on logout.

use tracing::{debug, error, instrument};

use super::refresh_token::RefreshToken;
use super::state::AuthState;

/// Revoke the session behind the presented refresh token.
///
/// Never fails: logout succeeds from the caller's point of view whatever
/// happens here. Only a holder of the session's current token can revoke it;
/// stale, forged and repeated presentations are no-ops. Returns whether a
/// session was revoked by this call.
#[instrument(skip_all)]
pub async fn logout(state: &AuthState, presented: Option<&str>) -> bool {
    let Some(token) = presented.and_then(|value| RefreshToken::parse(value).ok()) else {
        debug!("Logout without a usable refresh token");
        return false;
    };

    match state
        .store()
        .revoke_session(
            token.session_id,
            token.generation,
            &token.secret_hash(),
            state.now_unix(),
        )
        .await
    {
        Ok(revoked) => revoked,
        Err(err) => {
            error!("Failed to revoke session: {err:#}");
            false
        }
    }
}
