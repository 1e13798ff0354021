// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for authority calls and token handling.
//!
//! Extraction and identity resolution never surface these to the request;
//! they degrade to anonymous credentials and log. The one exception is
//! [`crate::oauth::ServiceTokenManager::current_token`]: a caller that needs
//! a service credential right now has no safe fallback, so renewal failures
//! propagate.

use thiserror::Error;

/// Failures from the authority transport, the token codec, and user resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token signature did not verify (wrong secret or wrong algorithm).
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// Token carried an `exp` claim in the past.
    #[error("token has expired")]
    Expired,

    /// Token could not be parsed, or its claims had an unexpected shape.
    #[error("token is malformed")]
    Malformed,

    /// Token's `iat` claim is ahead of the local clock.
    ///
    /// Internal to [`crate::oauth::TokenCodec::decode`], which retries once
    /// with the issued-at check disabled and never returns this variant.
    #[error("token issued-at claim is in the future")]
    IssuedInFuture,

    /// The authority answered with a non-200 status.
    #[error("authority returned HTTP {status}: {body}")]
    Authority { status: u16, body: String },

    /// The authority could not be reached at all.
    #[error("authority unreachable: {0}")]
    Unreachable(String),

    /// The authority has no record for the requested user.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The user exists but holds no effective role grant in the scope.
    #[error("user has no roles in scope {0}")]
    NoRolesInScope(String),

    /// Required configuration is missing or invalid.
    #[error("configuration missing or invalid: {0}")]
    MissingConfig(String),
}

impl AuthError {
    /// Whether this failure means the authority itself was unavailable,
    /// as opposed to a verdict about the presented token or user.
    pub fn is_authority_unavailable(&self) -> bool {
        matches!(self, AuthError::Authority { .. } | AuthError::Unreachable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_errors_are_unavailable() {
        assert!(AuthError::Unreachable("connection refused".into()).is_authority_unavailable());
        assert!(AuthError::Authority {
            status: 503,
            body: "down".into()
        }
        .is_authority_unavailable());
        assert!(!AuthError::SignatureInvalid.is_authority_unavailable());
        assert!(!AuthError::UnknownUser("alice".into()).is_authority_unavailable());
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = AuthError::Authority {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "authority returned HTTP 502: bad gateway");
    }
}
