//! Stateless access tokens: compact HS256 JWTs.
//!
//! Validity is decided by the signature and `exp` alone; nothing is looked up
//! server-side. A token is valid strictly before `exp` and rejected at or after it.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use ulid::Ulid;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";
const TYP: &str = "JWT";

/// The one role a credential can grant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// User identifier.
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so two tokens minted in the same second differ.
    pub jti: String,
}

/// A freshly minted access token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub claims: AccessClaims,
}

impl AccessToken {
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Signs and verifies access tokens with a shared HMAC key.
pub struct AccessTokenSigner {
    key: SecretString,
}

impl std::fmt::Debug for AccessTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenSigner").finish_non_exhaustive()
    }
}

impl AccessTokenSigner {
    #[must_use]
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|err| AuthError::Internal(anyhow::anyhow!("invalid signing key: {err}")))
    }

    /// Mint a token for `user_id` valid for `ttl_seconds` from `now_unix`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be encoded.
    pub fn sign(&self, user_id: Uuid, now_unix: i64, ttl_seconds: i64) -> Result<AccessToken, AuthError> {
        let claims = AccessClaims {
            sub: user_id,
            role: Role::Admin,
            iat: now_unix,
            exp: now_unix + ttl_seconds,
            jti: Ulid::new().to_string(),
        };
        let header = Header {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        };

        let header_b64 = b64e_json(&header)?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

        Ok(AccessToken {
            token: format!("{signing_input}.{signature_b64}"),
            claims,
        })
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// # Errors
    /// - `TokenMalformed` for bad structure, unexpected algorithm, bad signature or claims
    /// - `TokenExpired` when `now_unix >= exp`
    pub fn verify(&self, token: &str, now_unix: i64) -> Result<AccessClaims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::TokenMalformed);
        };

        let header: Header = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(AuthError::TokenMalformed);
        }

        let signature =
            Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| AuthError::TokenMalformed)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::TokenMalformed)?;

        let claims: AccessClaims = b64d_json(claims_b64)?;
        if claims.exp <= claims.iat {
            return Err(AuthError::TokenMalformed);
        }
        if now_unix >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value)
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("failed to encode token: {err}")))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, AuthError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| AuthError::TokenMalformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::TokenMalformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const NOW: i64 = 1_700_000_000;

    fn signer(key: &str) -> AccessTokenSigner {
        AccessTokenSigner::new(SecretString::from(key.to_string()))
    }

    #[test]
    fn sign_and_verify_before_expiry() -> Result<()> {
        let signer = signer("0123456789abcdef0123456789abcdef");
        let user_id = Uuid::new_v4();
        let token = signer.sign(user_id, NOW, 900)?;
        assert_eq!(token.expires_in(), 900);

        let claims = signer.verify(&token.token, NOW + 899)?;
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, NOW + 900);
        Ok(())
    }

    #[test]
    fn rejected_at_and_after_expiry_instant() -> Result<()> {
        let signer = signer("0123456789abcdef0123456789abcdef");
        let token = signer.sign(Uuid::new_v4(), NOW, 900)?;
        assert!(matches!(
            signer.verify(&token.token, NOW + 900),
            Err(AuthError::TokenExpired)
        ));
        assert!(matches!(
            signer.verify(&token.token, NOW + 3_600),
            Err(AuthError::TokenExpired)
        ));
        Ok(())
    }

    #[test]
    fn tokens_minted_in_same_second_differ() -> Result<()> {
        let signer = signer("0123456789abcdef0123456789abcdef");
        let user_id = Uuid::new_v4();
        let first = signer.sign(user_id, NOW, 900)?;
        let second = signer.sign(user_id, NOW, 900)?;
        assert_ne!(first.token, second.token);
        Ok(())
    }

    #[test]
    fn different_keys_reject() -> Result<()> {
        let token = signer("key-one-key-one-key-one-key-one!").sign(Uuid::new_v4(), NOW, 900)?;
        assert!(matches!(
            signer("key-two-key-two-key-two-key-two!").verify(&token.token, NOW),
            Err(AuthError::TokenMalformed)
        ));
        Ok(())
    }

    #[test]
    fn tampered_claims_reject() -> Result<()> {
        let signer = signer("0123456789abcdef0123456789abcdef");
        let token = signer.sign(Uuid::new_v4(), NOW, 900)?;
        let parts: Vec<&str> = token.token.split('.').collect();
        let mut claims = token.claims.clone();
        claims.exp += 86_400;
        let forged_claims = b64e_json(&claims)?;
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(matches!(
            signer.verify(&forged, NOW),
            Err(AuthError::TokenMalformed)
        ));
        Ok(())
    }

    #[test]
    fn unsigned_alg_none_rejects() -> Result<()> {
        let signer = signer("0123456789abcdef0123456789abcdef");
        let token = signer.sign(Uuid::new_v4(), NOW, 900)?;
        let parts: Vec<&str> = token.token.split('.').collect();
        let header = b64e_json(&Header {
            alg: "none".to_string(),
            typ: TYP.to_string(),
        })?;
        let forged = format!("{header}.{}.", parts[1]);
        assert!(matches!(
            signer.verify(&forged, NOW),
            Err(AuthError::TokenMalformed)
        ));
        Ok(())
    }

    #[test]
    fn unknown_role_is_malformed() -> Result<()> {
        let signer = signer("0123456789abcdef0123456789abcdef");
        let header_b64 = b64e_json(&Header {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        })?;
        let claims_b64 = Base64UrlUnpadded::encode_string(
            serde_json::json!({
                "sub": Uuid::new_v4(),
                "role": "superuser",
                "iat": NOW,
                "exp": NOW + 900,
                "jti": "x",
            })
            .to_string()
            .as_bytes(),
        );
        let signing_input = format!("{header_b64}.{claims_b64}");
        let mut mac = signer.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        let token = format!("{signing_input}.{signature}");
        assert!(matches!(
            signer.verify(&token, NOW),
            Err(AuthError::TokenMalformed)
        ));
        Ok(())
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let signer = signer("0123456789abcdef0123456789abcdef");
        for token in ["", "a.b", "a.b.c.d", "!!!.???.###"] {
            assert!(matches!(
                signer.verify(token, NOW),
                Err(AuthError::TokenMalformed)
            ));
        }
    }
}
