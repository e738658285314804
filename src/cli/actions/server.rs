use crate::api::{
    self,
    handlers::auth::{AuthConfig, AuthState, PgAuthStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub public_base_path: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the auth configuration is
/// invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        dsn = %redact_dsn(&args.dsn),
        frontend_base_url = %args.frontend_base_url,
        access_token_ttl_seconds = args.access_token_ttl_seconds,
        refresh_token_ttl_seconds = args.refresh_token_ttl_seconds,
        public_base_path = %args.public_base_path,
        "Startup configuration"
    );

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let auth_config = AuthConfig::new(args.frontend_base_url, args.token_secret)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_token_ttl_seconds(args.refresh_token_ttl_seconds)
        .with_public_base_path(&args.public_base_path);
    let auth_state = Arc::new(
        AuthState::new(auth_config, Arc::new(PgAuthStore::new(pool)))
            .context("Invalid auth configuration")?,
    );

    api::new(args.port, auth_state).await
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}
