//! In-process store for tests and local development.
//!
//! All state sits behind one `tokio::sync::Mutex`; each trait method holds the
//! lock for its whole read-check-write, which gives rotation the same
//! compare-and-swap semantics as the conditional SQL update.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::access_token::Role;
use super::storage::{
    AuthStore, InsertUserOutcome, NewSession, SessionRecord, SessionRotation, UserRecord,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    sessions: HashMap<Uuid, SessionRecord>,
}

#[derive(Default)]
pub struct MemoryAuthStore {
    inner: Mutex<Inner>,
}

impl MemoryAuthStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, live or not.
    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

impl std::fmt::Debug for MemoryAuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAuthStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<InsertUserOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|user| user.username == username) {
            return Ok(InsertUserOutcome::Conflict);
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::Admin,
        };
        inner.users.insert(user.id, user.clone());
        Ok(InsertUserOutcome::Created(user))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }

    async fn insert_session(&self, session: NewSession) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(
            session.id,
            SessionRecord {
                id: session.id,
                user_id: session.user_id,
                generation: 0,
                secret_hash: session.secret_hash,
                issued_at: session.issued_at,
                expires_at: session.expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.inner.lock().await.sessions.get(&session_id).cloned())
    }

    async fn rotate_session(&self, rotation: SessionRotation) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get_mut(&rotation.session_id) else {
            return Ok(false);
        };
        if session.revoked
            || session.generation != rotation.expected_generation
            || session.expires_at <= rotation.rotated_at
        {
            return Ok(false);
        }
        session.generation += 1;
        session.secret_hash = rotation.secret_hash;
        session.expires_at = rotation.expires_at;
        Ok(true)
    }

    async fn revoke_session(
        &self,
        session_id: Uuid,
        generation: i64,
        secret_hash: &[u8],
        _revoked_at: i64,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if session.revoked
            || session.generation != generation
            || session.secret_hash.as_slice() != secret_hash
        {
            return Ok(false);
        }
        session.revoked = true;
        Ok(true)
    }

    async fn purge_sessions(&self, now: i64) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, session| session.expires_at > now);
        Ok(u64::try_from(before - inner.sessions.len())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_session(user_id: Uuid) -> NewSession {
        NewSession {
            id: Uuid::new_v4(),
            user_id,
            secret_hash: vec![1; 32],
            issued_at: 100,
            expires_at: 1_000,
        }
    }

    fn rotation(session_id: Uuid, expected_generation: i64, at: i64) -> SessionRotation {
        SessionRotation {
            session_id,
            expected_generation,
            secret_hash: vec![2; 32],
            rotated_at: at,
            expires_at: at + 1_000,
        }
    }

    #[tokio::test]
    async fn usernames_are_unique() -> Result<()> {
        let store = MemoryAuthStore::new();
        assert!(matches!(
            store.insert_user("alice", "hash").await?,
            InsertUserOutcome::Created(_)
        ));
        assert!(matches!(
            store.insert_user("alice", "other").await?,
            InsertUserOutcome::Conflict
        ));
        assert!(store.find_user_by_username("alice").await?.is_some());
        assert!(store.find_user_by_username("bob").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn rotation_is_compare_and_swap() -> Result<()> {
        let store = MemoryAuthStore::new();
        let session = new_session(Uuid::new_v4());
        let id = session.id;
        store.insert_session(session).await?;

        assert!(store.rotate_session(rotation(id, 0, 200)).await?);
        assert!(!store.rotate_session(rotation(id, 0, 200)).await?);
        let record = store.find_session(id).await?;
        assert_eq!(record.map(|r| (r.generation, r.expires_at)), Some((1, 1_200)));
        Ok(())
    }

    #[tokio::test]
    async fn expired_or_revoked_sessions_do_not_rotate() -> Result<()> {
        let store = MemoryAuthStore::new();
        let expired = new_session(Uuid::new_v4());
        let expired_id = expired.id;
        store.insert_session(expired).await?;
        assert!(!store.rotate_session(rotation(expired_id, 0, 1_000)).await?);

        let revoked = new_session(Uuid::new_v4());
        let revoked_id = revoked.id;
        store.insert_session(revoked).await?;
        assert!(store.revoke_session(revoked_id, 0, &[1; 32], 150).await?);
        assert!(!store.rotate_session(rotation(revoked_id, 0, 200)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_requires_matching_generation_and_hash() -> Result<()> {
        let store = MemoryAuthStore::new();
        let session = new_session(Uuid::new_v4());
        let id = session.id;
        store.insert_session(session).await?;

        assert!(!store.revoke_session(id, 1, &[1; 32], 150).await?);
        assert!(!store.revoke_session(id, 0, &[9; 32], 150).await?);
        assert!(store.revoke_session(id, 0, &[1; 32], 150).await?);
        // Second revoke is a no-op.
        assert!(!store.revoke_session(id, 0, &[1; 32], 150).await?);
        Ok(())
    }

    #[tokio::test]
    async fn purge_drops_only_expired_sessions() -> Result<()> {
        let store = MemoryAuthStore::new();
        let user_id = Uuid::new_v4();
        let expired = new_session(user_id);
        let expired_id = expired.id;
        store.insert_session(expired).await?;
        let revoked = new_session(user_id);
        let revoked_id = revoked.id;
        store.insert_session(revoked).await?;
        assert!(store.revoke_session(revoked_id, 0, &[1; 32], 150).await?);
        let live = new_session(user_id);
        let live_id = live.id;
        store.insert_session(live).await?;
        assert!(store.rotate_session(rotation(live_id, 0, 500)).await?);

        // Revoked but unexpired sessions are kept until their expiry.
        assert_eq!(store.purge_sessions(999).await?, 0);
        assert_eq!(store.purge_sessions(1_000).await?, 2);
        assert!(store.find_session(expired_id).await?.is_none());
        assert!(store.find_session(revoked_id).await?.is_none());
        assert!(store.find_session(live_id).await?.is_some());
        assert_eq!(store.session_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_rotations_have_one_winner() -> Result<()> {
        let store = Arc::new(MemoryAuthStore::new());
        let session = new_session(Uuid::new_v4());
        let id = session.id;
        store.insert_session(session).await?;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.rotate_session(rotation(id, 0, 200)).await
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await?? {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        Ok(())
    }
}
