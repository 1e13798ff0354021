// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed-token envelope decoding.
//!
//! Every payload the authority produces - service-token grants, validation
//! verdicts, user records, and the bearer tokens end users present - is a JWT
//! signed with one shared secret. This codec verifies the signature and the
//! time claims and hands back the claims map; it never encodes, because all
//! tokens are minted by the authority.
//!
//! ## Clock skew
//!
//! The authority's clock can run slightly ahead of ours, producing tokens
//! whose `iat` claim is in the future. When that is the *only* problem, decode
//! retries once with the issued-at check disabled - signature and expiry stay
//! enforced. Any other failure is terminal.

use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::error::AuthError;

/// A verified authority payload.
///
/// Construction goes through [`TokenCodec::decode`] only, so holding a
/// `SignedEnvelope` means the signature already checked out.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    claims: Value,
}

impl SignedEnvelope {
    /// The verified claims map.
    pub fn claims(&self) -> &Value {
        &self.claims
    }

    /// Deserialize the claims into a typed view.
    ///
    /// A shape mismatch is reported as [`AuthError::Malformed`]; the envelope
    /// was still authentic, it just did not carry what the caller expected.
    pub fn claims_as<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        serde_json::from_value(self.claims.clone()).map_err(|_| AuthError::Malformed)
    }
}

/// Decoder bound to the module's fixed shared secret and algorithm.
#[derive(Clone)]
pub struct TokenCodec {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl std::fmt::Debug for TokenCodec {
    // The decoding key wraps the shared secret; keep it out of Debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
        }
    }

    /// Decode and verify a token, tolerating issuer clock skew on `iat`.
    pub fn decode(&self, raw: &str) -> Result<SignedEnvelope, AuthError> {
        match self.verify(raw, true) {
            Err(AuthError::IssuedInFuture) => {
                warn!("token issued-at claim is ahead of the local clock; retrying without issued-at check");
                self.verify(raw, false)
            }
            result => result,
        }
    }

    /// Single verification pass.
    ///
    /// jsonwebtoken checks signature and expiry; `iat` is checked here because
    /// the library does not validate issued-at. `exp` is enforced when present
    /// but not required - verdict envelopes such as validToken responses carry
    /// no expiry claim.
    fn verify(&self, raw: &str, verify_issued_at: bool) -> Result<SignedEnvelope, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims.clear();
        // Skew tolerance is the iat retry only; a past `exp` always rejects.
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Value>(raw, &self.key, &validation)
            .map_err(|e| map_jwt_error(&e))?;

        if verify_issued_at {
            if let Some(iat) = data.claims.get("iat").and_then(Value::as_i64) {
                if iat > Utc::now().timestamp() {
                    return Err(AuthError::IssuedInFuture);
                }
            }
        }

        Ok(SignedEnvelope {
            claims: data.claims,
        })
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        _ => AuthError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-shared-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Algorithm::HS256)
    }

    fn sign(claims: &Value) -> String {
        sign_with(claims, SECRET, Algorithm::HS256)
    }

    fn sign_with(claims: &Value, secret: &str, algorithm: Algorithm) -> String {
        encode(
            &Header::new(algorithm),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decodes_valid_token() {
        let now = Utc::now().timestamp();
        let token = sign(&json!({ "login": "alice", "iat": now, "exp": now + 3600 }));

        let envelope = codec().decode(&token).unwrap();
        assert_eq!(envelope.claims()["login"], "alice");
    }

    #[test]
    fn wrong_secret_is_signature_invalid() {
        let now = Utc::now().timestamp();
        let token = sign_with(
            &json!({ "login": "alice", "exp": now + 3600 }),
            "some-other-secret",
            Algorithm::HS256,
        );

        assert!(matches!(
            codec().decode(&token),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn wrong_algorithm_is_signature_invalid() {
        let now = Utc::now().timestamp();
        let token = sign_with(
            &json!({ "login": "alice", "exp": now + 3600 }),
            SECRET,
            Algorithm::HS384,
        );

        assert!(matches!(
            codec().decode(&token),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(&json!({ "login": "alice", "exp": now - 7200 }));

        assert!(matches!(codec().decode(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn recently_expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(&json!({ "login": "alice", "exp": now - 30 }));

        assert!(matches!(codec().decode(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            codec().decode("not-a-jwt"),
            Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn future_issued_at_decodes_via_skew_retry() {
        let now = Utc::now().timestamp();
        let token = sign(&json!({ "login": "alice", "iat": now + 5, "exp": now + 3600 }));

        let envelope = codec().decode(&token).unwrap();
        assert_eq!(envelope.claims()["login"], "alice");
    }

    #[test]
    fn skew_retry_does_not_rescue_bad_signatures() {
        let now = Utc::now().timestamp();
        let token = sign_with(
            &json!({ "login": "alice", "iat": now + 5, "exp": now + 3600 }),
            "some-other-secret",
            Algorithm::HS256,
        );

        assert!(matches!(
            codec().decode(&token),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn skew_retry_does_not_rescue_expired_tokens() {
        let now = Utc::now().timestamp();
        let token = sign(&json!({ "login": "alice", "iat": now + 5, "exp": now - 7200 }));

        assert!(matches!(codec().decode(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn envelope_without_exp_is_accepted() {
        let token = sign(&json!({ "user": "alice" }));

        let envelope = codec().decode(&token).unwrap();
        assert_eq!(envelope.claims()["user"], "alice");
    }

    #[test]
    fn typed_claims_view() {
        #[derive(serde::Deserialize)]
        struct Verdict {
            user: Option<String>,
        }

        let token = sign(&json!({ "user": "alice" }));
        let verdict: Verdict = codec().decode(&token).unwrap().claims_as().unwrap();
        assert_eq!(verdict.user.as_deref(), Some("alice"));
    }
}
