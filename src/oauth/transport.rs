// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authority operation table and HTTP transport.
//!
//! The authority exposes a fixed set of named operations; the HTTP method is a
//! property of the operation, never a caller choice. Parameters travel as
//! query parameters on GET and as a form-encoded body on POST. Every 200
//! response body is a signed envelope and goes through the codec; everything
//! else fails with the status and raw body attached. There is no caching and
//! no retrying here - retry policy belongs to the renewal loop.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use tracing::{error, info};

use super::codec::{SignedEnvelope, TokenCodec};
use super::error::AuthError;

/// The authority's named operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityOperation {
    GetAuthCode,
    GetAuthToken,
    SearchUser,
    ValidToken,
    GetUser,
    GetGroup,
    GetScopeUsers,
    GetScopes,
    GrantGlobalRoles,
    RevokeGlobalRoles,
}

impl AuthorityOperation {
    /// HTTP method, fixed per operation.
    pub fn method(&self) -> Method {
        match self {
            AuthorityOperation::GetScopeUsers | AuthorityOperation::GetScopes => Method::GET,
            _ => Method::POST,
        }
    }

    /// Path relative to the authority base URL.
    pub fn path(&self) -> &'static str {
        match self {
            AuthorityOperation::GetAuthCode => "get_authorization_code",
            AuthorityOperation::GetAuthToken => "get_auth_token",
            AuthorityOperation::SearchUser => "search_user",
            AuthorityOperation::ValidToken => "valid_token",
            AuthorityOperation::GetUser => "get_user",
            AuthorityOperation::GetGroup => "get_group",
            AuthorityOperation::GetScopeUsers => "get_users",
            AuthorityOperation::GetScopes => "get_scopes",
            AuthorityOperation::GrantGlobalRoles => "grant_scope_roles",
            AuthorityOperation::RevokeGlobalRoles => "deny_scope_roles",
        }
    }
}

/// HTTP client for the configured authority.
#[derive(Debug, Clone)]
pub struct AuthTransport {
    base_url: String,
    http: Client,
    codec: TokenCodec,
}

impl AuthTransport {
    /// Build a transport for the given base URL (must end with `/`).
    pub fn new(base_url: String, codec: TokenCodec, timeout: Duration) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            codec,
        })
    }

    /// The codec bound to this authority's shared secret.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Perform one authority operation and decode the signed response.
    ///
    /// Parameter values are not logged; several operations carry the client
    /// secret or live tokens.
    pub async fn call(
        &self,
        operation: AuthorityOperation,
        params: &[(&str, &str)],
    ) -> Result<SignedEnvelope, AuthError> {
        let method = operation.method();
        let url = format!("{}{}", self.base_url, operation.path());
        let param_names: Vec<&str> = params.iter().map(|(name, _)| *name).collect();

        info!(%method, %url, params = ?param_names, "calling authority");

        let request = if method == Method::GET {
            self.http.get(&url).query(params)
        } else {
            self.http.post(&url).form(params)
        };

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        if status != StatusCode::OK {
            error!(status = status.as_u16(), %body, %url, "authority returned an error");
            return Err(AuthError::Authority {
                status: status.as_u16(),
                body,
            });
        }

        self.codec.decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-shared-secret";

    fn sign(claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    async fn transport(server: &MockServer) -> AuthTransport {
        AuthTransport::new(
            format!("{}/", server.uri()),
            TokenCodec::new(SECRET, Algorithm::HS256),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn operation_table_is_fixed() {
        assert_eq!(AuthorityOperation::GetAuthToken.method(), Method::POST);
        assert_eq!(AuthorityOperation::GetAuthToken.path(), "get_auth_token");
        assert_eq!(AuthorityOperation::ValidToken.path(), "valid_token");
        assert_eq!(AuthorityOperation::GetScopeUsers.method(), Method::GET);
        assert_eq!(AuthorityOperation::GetScopes.method(), Method::GET);
        assert_eq!(AuthorityOperation::RevokeGlobalRoles.path(), "deny_scope_roles");
    }

    #[tokio::test]
    async fn post_sends_form_body_and_decodes_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/valid_token"))
            .and(body_string_contains("token=tok1"))
            .and(body_string_contains("scope=site1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sign(&json!({ "user": "alice" }))))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = transport(&server)
            .await
            .call(
                AuthorityOperation::ValidToken,
                &[("token", "tok1"), ("scope", "site1")],
            )
            .await
            .unwrap();

        assert_eq!(envelope.claims()["user"], "alice");
    }

    #[tokio::test]
    async fn get_sends_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_scopes"))
            .and(query_param("service_token", "svc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sign(&json!({ "scopes": ["site1"] }))))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = transport(&server)
            .await
            .call(AuthorityOperation::GetScopes, &[("service_token", "svc")])
            .await
            .unwrap();

        assert_eq!(envelope.claims()["scopes"][0], "site1");
    }

    #[tokio::test]
    async fn non_200_fails_with_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_user"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .call(AuthorityOperation::GetUser, &[("user", "alice")])
            .await
            .unwrap_err();

        match err {
            AuthError::Authority { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected Authority error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsigned_body_fails_decode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_auth_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"plain\":\"json\"}"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .call(AuthorityOperation::GetAuthToken, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Malformed));
    }
}
