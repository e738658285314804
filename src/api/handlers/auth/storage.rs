//! Persistence seam for credentials and refresh-token sessions.
//!
//! Every method is a single independent transaction. Rotation and revocation
//! are conditional updates: they report whether the row matched instead of
//! taking a lock that outlives the call.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::access_token::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Server-side state of one refresh-token lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub generation: i64,
    pub secret_hash: Vec<u8>,
    pub issued_at: i64,
    pub expires_at: i64,
    pub revoked: bool,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub secret_hash: Vec<u8>,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Compare-and-swap input for moving a session from `expected_generation` to
/// `expected_generation + 1`.
#[derive(Debug, Clone)]
pub struct SessionRotation {
    pub session_id: Uuid,
    pub expected_generation: i64,
    pub secret_hash: Vec<u8>,
    pub rotated_at: i64,
    pub expires_at: i64,
}

#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(UserRecord),
    Conflict,
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<()>;

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<InsertUserOutcome>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>>;

    /// Persist a generation-0 session.
    async fn insert_session(&self, session: NewSession) -> Result<()>;

    async fn find_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>>;

    /// Advance the generation iff the session is still at `expected_generation`,
    /// not revoked and not expired at `rotated_at`.
    ///
    /// Returns `true` for exactly one of any set of concurrent callers that
    /// present the same expected generation.
    async fn rotate_session(&self, rotation: SessionRotation) -> Result<bool>;

    /// Revoke the session iff it is live at `generation` with `secret_hash`.
    ///
    /// Returns `false` when nothing matched (already revoked, stale or foreign token).
    async fn revoke_session(
        &self,
        session_id: Uuid,
        generation: i64,
        secret_hash: &[u8],
        revoked_at: i64,
    ) -> Result<bool>;

    /// Delete every session whose expiry is at or before `now`, revoked or
    /// not, and return how many went.
    ///
    /// Revoked sessions stay until they expire so a logged-out token keeps
    /// reporting `TokenRevoked` rather than `TokenMalformed`.
    async fn purge_sessions(&self, now: i64) -> Result<u64>;
}
