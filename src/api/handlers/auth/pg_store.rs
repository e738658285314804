//! PostgreSQL-backed [`AuthStore`] (schema in `sql/schema.sql`).
//!
//! Timestamps cross the boundary as unix seconds: bound through
//! `to_timestamp($n::double precision)` and read back with `EXTRACT(EPOCH ...)`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::access_token::Role;
use super::storage::{
    AuthStore, InsertUserOutcome, NewSession, SessionRecord, SessionRotation, UserRecord,
};
use super::utils::is_unique_violation;

#[derive(Clone, Debug)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_epoch(unix: i64) -> f64 {
    unix as f64
}

fn parse_role(value: &str) -> Result<Role> {
    match value {
        "admin" => Ok(Role::Admin),
        other => Err(anyhow!("unknown role in admin_users: {other}")),
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.get("role");
    Ok(UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: parse_role(&role)?,
    })
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("database ping failed")?;
        Ok(())
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<InsertUserOutcome> {
        let query = r"
            INSERT INTO admin_users (id, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, role
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(Uuid::now_v7())
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertUserOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert admin user"),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let query = "SELECT id, username, password_hash, role FROM admin_users WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup admin user by username")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let query = "SELECT id, username, password_hash, role FROM admin_users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup admin user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_session(&self, session: NewSession) -> Result<()> {
        let query = r"
            INSERT INTO admin_sessions (id, user_id, generation, secret_hash, issued_at, expires_at)
            VALUES ($1, $2, 0, $3, to_timestamp($4::double precision), to_timestamp($5::double precision))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.secret_hash)
            .bind(as_epoch(session.issued_at))
            .bind(as_epoch(session.expires_at))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert admin session")?;
        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT
                id,
                user_id,
                generation,
                secret_hash,
                EXTRACT(EPOCH FROM issued_at)::BIGINT AS issued_at_unix,
                EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix,
                revoked_at IS NOT NULL AS revoked
            FROM admin_sessions
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup admin session")?;

        Ok(row.map(|row| SessionRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            generation: row.get("generation"),
            secret_hash: row.get("secret_hash"),
            issued_at: row.get("issued_at_unix"),
            expires_at: row.get("expires_at_unix"),
            revoked: row.get("revoked"),
        }))
    }

    async fn rotate_session(&self, rotation: SessionRotation) -> Result<bool> {
        let query = r"
            UPDATE admin_sessions
            SET generation = generation + 1,
                secret_hash = $3,
                rotated_at = to_timestamp($4::double precision),
                expires_at = to_timestamp($5::double precision)
            WHERE id = $1
              AND generation = $2
              AND revoked_at IS NULL
              AND expires_at > to_timestamp($4::double precision)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(rotation.session_id)
            .bind(rotation.expected_generation)
            .bind(rotation.secret_hash)
            .bind(as_epoch(rotation.rotated_at))
            .bind(as_epoch(rotation.expires_at))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to rotate admin session")?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_session(
        &self,
        session_id: Uuid,
        generation: i64,
        secret_hash: &[u8],
        revoked_at: i64,
    ) -> Result<bool> {
        let query = r"
            UPDATE admin_sessions
            SET revoked_at = to_timestamp($4::double precision)
            WHERE id = $1
              AND generation = $2
              AND secret_hash = $3
              AND revoked_at IS NULL
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(session_id)
            .bind(generation)
            .bind(secret_hash)
            .bind(as_epoch(revoked_at))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to revoke admin session")?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge_sessions(&self, now: i64) -> Result<u64> {
        let query = "DELETE FROM admin_sessions WHERE expires_at <= to_timestamp($1::double precision)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(as_epoch(now))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired admin sessions")?;
        Ok(result.rows_affected())
    }
}
