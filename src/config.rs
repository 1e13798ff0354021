// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and the `Settings` struct
//! loaded from them at startup. Configuration is process-wide and static;
//! nothing here mutates at runtime.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTHORITY_BASE_URL` | Base URL of the OAuth authority | Required |
//! | `AUTHORITY_JWT_SECRET` | Shared secret for signed envelopes | Required |
//! | `AUTHORITY_JWT_ALGORITHM` | HMAC algorithm (`HS256`/`HS384`/`HS512`) | `HS256` |
//! | `AUTHORITY_CLIENT_ID` | Client id for the service-credential grant | Required |
//! | `AUTHORITY_CLIENT_SECRET` | Client secret for the service-credential grant | Required |
//! | `AUTHORITY_HTTP_TIMEOUT_SECS` | Timeout for authority calls | `15` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::oauth::AuthError;

pub const AUTHORITY_BASE_URL_ENV: &str = "AUTHORITY_BASE_URL";
pub const JWT_SECRET_ENV: &str = "AUTHORITY_JWT_SECRET";
pub const JWT_ALGORITHM_ENV: &str = "AUTHORITY_JWT_ALGORITHM";
pub const CLIENT_ID_ENV: &str = "AUTHORITY_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "AUTHORITY_CLIENT_SECRET";
pub const HTTP_TIMEOUT_ENV: &str = "AUTHORITY_HTTP_TIMEOUT_SECS";

const DEFAULT_JWT_ALGORITHM: &str = "HS256";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Static process configuration for the authority connection.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Authority base URL, normalized to end with `/`.
    pub base_url: String,
    /// Shared secret every signed envelope is verified against.
    pub jwt_secret: String,
    /// HMAC algorithm for envelope verification.
    pub jwt_algorithm: Algorithm,
    /// Client id presented for the service-credential grant.
    pub client_id: String,
    /// Client secret presented for the service-credential grant.
    pub client_secret: String,
    /// HTTP timeout for every authority call.
    pub http_timeout: Duration,
}

impl Settings {
    /// Load settings from the environment.
    pub fn from_env() -> Result<Self, AuthError> {
        let base_url = normalize_base_url(&env_required(AUTHORITY_BASE_URL_ENV)?)?;
        let jwt_secret = env_required(JWT_SECRET_ENV)?;
        let jwt_algorithm =
            parse_algorithm(&env_or_default(JWT_ALGORITHM_ENV, DEFAULT_JWT_ALGORITHM))?;
        let client_id = env_required(CLIENT_ID_ENV)?;
        let client_secret = env_required(CLIENT_SECRET_ENV)?;

        let timeout_secs = env_or_default(HTTP_TIMEOUT_ENV, "")
            .parse()
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Ok(Self {
            base_url,
            jwt_secret,
            jwt_algorithm,
            client_id,
            client_secret,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn env_required(name: &str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::MissingConfig(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse the configured HMAC algorithm.
///
/// Only the shared-secret family is meaningful here; envelopes are verified
/// against one symmetric secret, not a key set.
fn parse_algorithm(raw: &str) -> Result<Algorithm, AuthError> {
    match raw.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(AuthError::MissingConfig(format!(
            "{JWT_ALGORITHM_ENV}: unsupported algorithm {other}"
        ))),
    }
}

/// Validate the base URL and guarantee a trailing slash so operation paths
/// append cleanly.
fn normalize_base_url(raw: &str) -> Result<String, AuthError> {
    let url = Url::parse(raw)
        .map_err(|e| AuthError::MissingConfig(format!("{AUTHORITY_BASE_URL_ENV}: {e}")))?;

    let mut normalized = url.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithms_parse_case_insensitively() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm("hs384").unwrap(), Algorithm::HS384);
        assert_eq!(parse_algorithm("HS512").unwrap(), Algorithm::HS512);
    }

    #[test]
    fn asymmetric_algorithms_are_rejected() {
        assert!(matches!(
            parse_algorithm("RS256"),
            Err(AuthError::MissingConfig(_))
        ));
        assert!(matches!(
            parse_algorithm("none"),
            Err(AuthError::MissingConfig(_))
        ));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://auth.example").unwrap(),
            "https://auth.example/"
        );
        assert_eq!(
            normalize_base_url("https://auth.example/oauth/").unwrap(),
            "https://auth.example/oauth/"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(AuthError::MissingConfig(_))
        ));
    }
}
