//! Opaque refresh tokens.
//!
//! Wire form is `<session_id>.<generation>.<secret>`: the session id is a
//! simple-format UUID, the generation a decimal counter and the secret 32 random
//! bytes in unpadded base64url. The server stores only the SHA-256 hash of the
//! secret, so a database leak does not hand out live tokens.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::error::AuthError;

const SECRET_BYTES: usize = 32;

pub struct RefreshToken {
    pub session_id: Uuid,
    pub generation: i64,
    secret: SecretString,
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("session_id", &self.session_id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl RefreshToken {
    /// Mint a token with a fresh random secret.
    ///
    /// # Errors
    /// Fails only if the OS random source is unavailable.
    pub fn generate(session_id: Uuid, generation: i64) -> Result<Self> {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate refresh token secret")?;
        Ok(Self {
            session_id,
            generation,
            secret: SecretString::from(Base64UrlUnpadded::encode_string(&bytes)),
        })
    }

    /// Parse the cookie value. Anything off-format is `TokenMalformed`.
    ///
    /// # Errors
    /// Returns `AuthError::TokenMalformed` when the value does not have the
    /// three expected parts or any part fails to decode.
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let mut parts = value.trim().split('.');
        let (Some(session_id), Some(generation), Some(secret), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::TokenMalformed);
        };

        let session_id = Uuid::try_parse(session_id).map_err(|_| AuthError::TokenMalformed)?;
        let generation: i64 = generation.parse().map_err(|_| AuthError::TokenMalformed)?;
        if generation < 0 {
            return Err(AuthError::TokenMalformed);
        }
        let decoded = Base64UrlUnpadded::decode_vec(secret).map_err(|_| AuthError::TokenMalformed)?;
        if decoded.len() != SECRET_BYTES {
            return Err(AuthError::TokenMalformed);
        }

        Ok(Self {
            session_id,
            generation,
            secret: SecretString::from(secret.to_string()),
        })
    }

    /// Cookie value. Only ever written into a `Set-Cookie` header.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            self.session_id.simple(),
            self.generation,
            self.secret.expose_secret()
        )
    }

    #[must_use]
    pub fn secret_hash(&self) -> Vec<u8> {
        hash_secret(self.secret.expose_secret())
    }
}

/// Hash a refresh secret so raw values never touch the store.
pub(super) fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
