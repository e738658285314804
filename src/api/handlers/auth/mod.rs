//! Admin authentication: token issuance, refresh-token rotation and revocation.
//!
//! ## Tokens
//!
//! - **Access token:** HS256 JWT carrying `{sub, role, iat, exp, jti}`. Stateless;
//!   presented as `Authorization: Bearer`. Short-lived (minutes).
//! - **Refresh token:** opaque `<session>.<generation>.<secret>` in an `HttpOnly`
//!   cookie scoped to `/auth`. Long-lived (days). Only the SHA-256 of the secret
//!   is stored.
//!
//! ## Rotation
//!
//! Every `GET /auth/token` moves the session from generation N to N+1 with a
//! compare-and-swap on the expected generation. Presenting N again afterwards
//! fails with `token_superseded`. Logout revokes the session when, and only
//! when, the presented cookie is the current generation.

pub(crate) mod access_token;
pub(crate) mod clock;
mod cookie;
pub(crate) mod error;
pub(crate) mod issuer;
pub(crate) mod login;
pub(crate) mod logout;
mod memory_store;
mod password;
mod pg_store;
pub(crate) mod principal;
mod refresh_token;
pub(crate) mod register;
mod revoker;
mod rotation;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod token;
pub(crate) mod types;
mod utils;

pub use access_token::{AccessClaims, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cookie::REFRESH_COOKIE_NAME;
pub use error::{AuthError, ErrorBody, ErrorCode};
pub use memory_store::MemoryAuthStore;
pub use pg_store::PgAuthStore;
pub use principal::Principal;
pub use state::{
    AuthConfig, AuthState, DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
    MIN_TOKEN_SECRET_BYTES, validate_ttls,
};
pub use storage::{
    AuthStore, InsertUserOutcome, NewSession, SessionRecord, SessionRotation, UserRecord,
};
pub use types::{CredentialsRequest, SessionResponse, TokenResponse};
