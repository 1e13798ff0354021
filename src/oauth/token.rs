// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Token Lifecycle
//!
//! The process authenticates its own calls to the authority with a single
//! service token obtained through the service-credential grant. This module
//! owns that token: a lazy refresh path for callers that need it now, and a
//! background renewal loop that keeps it fresh so routine traffic never waits
//! on a synchronous renewal.
//!
//! ## Concurrency
//!
//! The held token sits behind an `RwLock` so readers always observe a fully
//! formed value. Renewal itself is single-flighted behind an async mutex: when
//! several callers find the token stale at the same instant, one performs the
//! grant call and the rest re-check after the lock and reuse its result. The
//! background loop renews through the same path, so it cannot race the lazy
//! refresh into a duplicate call.
//!
//! ## Shutdown
//!
//! The renewal loop parks in `tokio::time::sleep` until the token's expiry and
//! is cancellable there via `CancellationToken`, with no side effects.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::AuthError;
use super::transport::{AuthTransport, AuthorityOperation};

/// How long to wait before retrying after a failed renewal.
const RENEWAL_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// The process's credential for outbound authority calls.
///
/// Replaced wholesale on renewal, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl ServiceToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The opaque token string the authority expects back.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Strictly-future expiry check; a token expiring exactly now is stale.
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        self.expires_at > instant
    }
}

/// Claims of a service-credential grant envelope.
#[derive(Debug, Deserialize)]
struct ServiceTokenGrant {
    service_token: String,
    exp: i64,
}

/// Owner of the process-wide service token.
pub struct ServiceTokenManager {
    transport: Arc<AuthTransport>,
    client_id: String,
    client_secret: String,
    current: RwLock<Option<ServiceToken>>,
    renewal: Mutex<()>,
}

impl ServiceTokenManager {
    pub fn new(
        transport: Arc<AuthTransport>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            current: RwLock::new(None),
            renewal: Mutex::new(()),
        }
    }

    /// A service token guaranteed unexpired at hand-off.
    ///
    /// Returns the held token while it is strictly unexpired; otherwise
    /// renews it first. Renewal failure means no valid service credential is
    /// available right now, and the caller must treat it that way.
    pub async fn current_token(&self) -> Result<ServiceToken, AuthError> {
        if let Some(token) = self.held_token().await {
            return Ok(token);
        }
        self.renew().await
    }

    /// Whether a valid token is currently held, without triggering renewal.
    pub async fn is_cached(&self) -> bool {
        self.held_token().await.is_some()
    }

    async fn held_token(&self) -> Option<ServiceToken> {
        let guard = self.current.read().await;
        guard
            .as_ref()
            .filter(|token| token.is_valid_at(Utc::now()))
            .cloned()
    }

    async fn renew(&self) -> Result<ServiceToken, AuthError> {
        let _flight = self.renewal.lock().await;

        // Another caller may have finished renewing while we waited.
        if let Some(token) = self.held_token().await {
            return Ok(token);
        }

        info!(client_id = %self.client_id, "obtaining service token");
        let envelope = self
            .transport
            .call(
                AuthorityOperation::GetAuthToken,
                &[
                    ("client_id", &self.client_id),
                    ("client_secret", &self.client_secret),
                    ("grant_type", "service"),
                ],
            )
            .await?;

        let grant: ServiceTokenGrant = envelope.claims_as()?;
        let expires_at = DateTime::from_timestamp(grant.exp, 0).ok_or(AuthError::Malformed)?;
        let token = ServiceToken::new(grant.service_token, expires_at);

        if !token.is_valid_at(Utc::now()) {
            return Err(AuthError::Unreachable(
                "authority issued an already-expired service token".to_string(),
            ));
        }

        *self.current.write().await = Some(token.clone());
        Ok(token)
    }

    /// Run the proactive renewal loop until the cancellation token fires.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(tokens.clone().run(shutdown.clone()));
    /// ```
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!("service token renewal loop starting");

        loop {
            if shutdown.is_cancelled() {
                info!("service token renewal loop shutting down");
                return;
            }

            let sleep_for = match self.current_token().await {
                Ok(token) => {
                    let remaining = token.expires_at() - Utc::now();
                    remaining.to_std().unwrap_or(Duration::ZERO)
                }
                Err(e) => {
                    warn!(error = %e, "service token renewal failed; will retry");
                    RENEWAL_RETRY_INTERVAL
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.cancelled() => {
                    info!("service token renewal loop shutting down");
                    return;
                }
            }
        }
    }
}
