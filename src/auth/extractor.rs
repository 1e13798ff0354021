// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request bearer credential extraction and cross-validation.
//!
//! ## Pipeline
//!
//! 1. Read the `Authorization` header; anything but a bearer scheme means
//!    anonymous credentials, never an error.
//! 2. Decode the token locally against the module's shared secret.
//! 3. Cross-validate the decoded token against the authority's `validToken`
//!    operation. This is mandatory even after a good local decode: it catches
//!    tokens that are cryptographically valid but revoked, or whose subject
//!    no longer matches the authority's live record.
//! 4. Accept the remote verdict only when it names exactly the login the
//!    token itself claims. A mismatch is treated as *invalid*, not as the
//!    other user.
//!
//! Failures at any step degrade to anonymous credentials and log; they never
//! fail the request. That degradation is part of the return contract, not a
//! swallowed error.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Deserialize;
use tracing::warn;

use crate::oauth::{AuthError, AuthorityOperation};
use crate::state::AppState;

use super::identity::{resolve_identity, ResolvedUser};

/// Scope (tenant/site) identifier the hosting framework attaches to each
/// request as an extension.
#[derive(Debug, Clone)]
pub struct RequestScope(pub String);

/// Claims a bearer token must carry: the subject login and the inner token
/// the authority can look up.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerClaims {
    pub login: String,
    pub token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Additive, request-scoped credential cache.
///
/// `claims` without `validated_login` means "token parsed but not trusted";
/// no `validated_login` means "not authenticated".
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    pub claims: Option<BearerClaims>,
    pub validated_login: Option<String>,
}

impl RequestCredentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.validated_login.is_some()
    }
}

/// Verdict claims of a `validToken` envelope.
#[derive(Debug, Deserialize)]
struct ValidationVerdict {
    #[serde(default)]
    user: Option<String>,
}

/// Extract and cross-validate the request's bearer credentials.
pub async fn extract_credentials(
    state: &AppState,
    headers: &HeaderMap,
    scope: &str,
) -> RequestCredentials {
    let Some(claims) = local_claims(state, headers) else {
        return RequestCredentials::anonymous();
    };

    let validated_login = match cross_validate(state, &claims, scope).await {
        Ok(Some(login)) if login == claims.login => Some(login),
        Ok(Some(other)) => {
            warn!(
                claimed = %claims.login,
                validated = %other,
                "bearer token subject does not match authority record"
            );
            None
        }
        Ok(None) => {
            warn!(login = %claims.login, scope, "authority rejected bearer token");
            None
        }
        Err(e) => {
            warn!(login = %claims.login, scope, error = %e, "bearer token cross-validation failed");
            None
        }
    };

    RequestCredentials {
        claims: Some(claims),
        validated_login,
    }
}

/// Parse and locally decode the bearer token, without remote validation.
fn local_claims(state: &AppState, headers: &HeaderMap) -> Option<BearerClaims> {
    let token = bearer_token(headers)?;
    match state
        .transport
        .codec()
        .decode(token)
        .and_then(|envelope| envelope.claims_as())
    {
        Ok(claims) => Some(claims),
        Err(e) => {
            warn!(error = %e, "invalid bearer token");
            None
        }
    }
}

/// Ask the authority whether the presented token is live in this scope.
async fn cross_validate(
    state: &AppState,
    claims: &BearerClaims,
    scope: &str,
) -> Result<Option<String>, AuthError> {
    let service = state.tokens.current_token().await?;
    let envelope = state
        .transport
        .call(
            AuthorityOperation::ValidToken,
            &[
                ("code", service.value()),
                ("token", &claims.token),
                ("scope", scope),
            ],
        )
        .await?;

    let verdict: ValidationVerdict = envelope.claims_as()?;
    Ok(verdict.user)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor resolving the request's user, falling back to anonymous.
///
/// Never rejects: an unauthenticated or unresolvable caller is
/// [`ResolvedUser::Anonymous`], and the handler decides what that may do.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     // user is ResolvedUser::Anonymous or ResolvedUser::Authenticated(..)
/// }
/// ```
pub struct CurrentUser(pub ResolvedUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A previous extraction on this request already resolved the user.
        if let Some(user) = parts.extensions.get::<ResolvedUser>().cloned() {
            return Ok(CurrentUser(user));
        }

        let Some(scope) = parts.extensions.get::<RequestScope>().map(|s| s.0.clone()) else {
            // No scope to validate against; still parse the token locally so
            // later extractions see the untrusted claims.
            let credentials = RequestCredentials {
                claims: local_claims(state, &parts.headers),
                validated_login: None,
            };
            parts.extensions.insert(credentials);
            parts.extensions.insert(ResolvedUser::Anonymous);
            return Ok(CurrentUser(ResolvedUser::Anonymous));
        };

        let credentials = extract_credentials(state, &parts.headers, &scope).await;
        parts.extensions.insert(credentials.clone());

        let user = resolve_identity(state, &credentials, &scope).await;
        parts.extensions.insert(user.clone());
        Ok(CurrentUser(user))
    }
}
