use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::{MIN_TOKEN_SECRET_BYTES, validate_ttls};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL_SECONDS: &str = "refresh-token-ttl-seconds";
pub const ARG_PUBLIC_BASE_PATH: &str = "public-base-path";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Admin frontend base URL (CORS origin; https enables Secure cookies)")
                .env("MERAPI_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC key used to sign access tokens (at least 32 bytes)")
                .env("MERAPI_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Access token TTL in seconds")
                .env("MERAPI_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .long(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .help("Refresh token TTL in seconds")
                .env("MERAPI_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_PATH)
                .long(ARG_PUBLIC_BASE_PATH)
                .help("Path prefix the API is served under, e.g. /v1 (scopes the refresh cookie)")
                .env("MERAPI_PUBLIC_BASE_PATH")
                .default_value("/"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub public_base_path: String,
}

impl Options {
    /// # Errors
    /// Returns an error when the secret is missing or too short, or the TTL
    /// pair is inconsistent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string());
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;
        if token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            anyhow::bail!("--token-secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes");
        }
        let access_token_ttl_seconds = matches
            .get_one::<i64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(900);
        let refresh_token_ttl_seconds = matches
            .get_one::<i64>(ARG_REFRESH_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800);
        validate_ttls(access_token_ttl_seconds, refresh_token_ttl_seconds)?;
        let public_base_path = matches
            .get_one::<String>(ARG_PUBLIC_BASE_PATH)
            .cloned()
            .unwrap_or_else(|| "/".to_string());
        if !public_base_path.trim().starts_with('/') {
            anyhow::bail!("--public-base-path must start with '/'");
        }

        Ok(Self {
            frontend_base_url,
            token_secret: SecretString::from(token_secret),
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            public_base_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn parse(args: &[&str]) -> Result<Options> {
        let mut argv = vec!["merapi"];
        argv.extend_from_slice(args);
        let matches = with_args(Command::new("merapi")).try_get_matches_from(argv)?;
        Options::parse(&matches)
    }

    fn clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("MERAPI_FRONTEND_BASE_URL", None::<&str>),
                ("MERAPI_TOKEN_SECRET", None),
                ("MERAPI_ACCESS_TOKEN_TTL_SECONDS", None),
                ("MERAPI_REFRESH_TOKEN_TTL_SECONDS", None),
                ("MERAPI_PUBLIC_BASE_PATH", None),
            ],
            f,
        );
    }

    #[test]
    fn defaults_apply() {
        clean_env(|| {
            let options = parse(&["--token-secret", SECRET]);
            assert!(options.is_ok());
            if let Ok(options) = options {
                assert_eq!(options.frontend_base_url, "http://localhost:3000");
                assert_eq!(options.access_token_ttl_seconds, 900);
                assert_eq!(options.refresh_token_ttl_seconds, 604_800);
                assert_eq!(options.token_secret.expose_secret(), SECRET);
                assert_eq!(options.public_base_path, "/");
            }
        });
    }

    #[test]
    fn secret_from_env() {
        temp_env::with_vars([("MERAPI_TOKEN_SECRET", Some(SECRET))], || {
            assert!(parse(&[]).is_ok());
        });
    }

    #[test]
    fn short_secret_rejected() {
        clean_env(|| {
            let result = parse(&["--token-secret", "short"]);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("at least 32 bytes"));
            }
        });
    }

    #[test]
    fn public_base_path_must_be_absolute() {
        clean_env(|| {
            let options = parse(&["--token-secret", SECRET, "--public-base-path", "/v1"]);
            assert_eq!(
                options.ok().map(|options| options.public_base_path),
                Some("/v1".to_string())
            );
            assert!(parse(&["--token-secret", SECRET, "--public-base-path", "v1"]).is_err());
        });
    }

    #[test]
    fn access_ttl_must_be_shorter_than_refresh_ttl() {
        clean_env(|| {
            let result = parse(&[
                "--token-secret",
                SECRET,
                "--access-token-ttl-seconds",
                "3600",
                "--refresh-token-ttl-seconds",
                "3600",
            ]);
            assert!(result.is_err());
        });
    }
}
