//! # Merapi (Admin Authentication)
//!
//! `merapi` authenticates the administrators of the Tanah Merapi dashboard and
//! keeps their sessions alive.
//!
//! ## Tokens
//!
//! - **Access token:** short-lived HS256 JWT returned in the response body and
//!   sent back as `Authorization: Bearer`. Never persisted by the server.
//! - **Refresh token:** opaque `<session>.<generation>.<secret>` value stored in
//!   an `HttpOnly` cookie scoped to `/auth`. Only a SHA-256 of the secret is
//!   kept in the database.
//!
//! ## Rotation
//!
//! Every refresh consumes the presented token and issues the next generation.
//! A token succeeds at most once; concurrent presenters race on a conditional
//! update and the losers get `token_superseded`.
//!
//! ## Client
//!
//! [`client`] holds the admin-side half: an HTTP client that keeps the refresh
//! cookie in its own jar, an explicit [`client::Session`] value and the
//! route [`client::Guard`] that verifies or refreshes before rendering.

pub mod api;
pub mod cli;
pub mod client;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
