// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization-code endpoint.
//!
//! Thin composition over the service token and the authority's `getAuthCode`
//! operation. Failures degrade to `{"auth_code": null}` and log; the endpoint
//! never turns an authority problem into a 5xx.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::auth::RequestScope;
use crate::oauth::AuthorityOperation;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuthCodeQuery {
    /// Client id to request the code for; defaults to the configured one.
    pub client_id: Option<String>,
    /// Scope to request the code in; used when the request carries no scope
    /// extension.
    pub scope: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthCodeResponse {
    /// The authorization code, or null when none could be obtained.
    pub auth_code: Option<String>,
}

/// Claims of a `getAuthCode` envelope.
#[derive(Debug, Deserialize)]
struct AuthCodeGrant {
    #[serde(default)]
    auth_code: Option<String>,
}

/// Obtain an authorization code for a client in a scope.
#[utoipa::path(
    get,
    path = "/@authorization-code",
    tag = "Credentials",
    params(AuthCodeQuery),
    responses(
        (status = 200, description = "Authorization code, or null when unavailable", body = AuthCodeResponse)
    )
)]
pub async fn get_auth_code(
    State(state): State<AppState>,
    scope: Option<Extension<RequestScope>>,
    Query(query): Query<AuthCodeQuery>,
) -> Json<AuthCodeResponse> {
    let scope = scope
        .map(|Extension(RequestScope(scope))| scope)
        .or(query.scope);

    let Some(scope) = scope else {
        warn!("authorization code requested without a scope");
        return Json(AuthCodeResponse { auth_code: None });
    };

    let client_id = query.client_id.unwrap_or_else(|| state.client_id.clone());
    let auth_code = fetch_auth_code(&state, &client_id, &scope).await;
    Json(AuthCodeResponse { auth_code })
}

async fn fetch_auth_code(state: &AppState, client_id: &str, scope: &str) -> Option<String> {
    let service = match state.tokens.current_token().await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "no service token available for authorization code request");
            return None;
        }
    };

    let envelope = match state
        .transport
        .call(
            AuthorityOperation::GetAuthCode,
            &[
                ("client_id", client_id),
                ("service_token", service.value()),
                ("scopes", scope),
                ("response_type", "code"),
            ],
        )
        .await
    {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, scope, "authorization code request failed");
            return None;
        }
    };

    match envelope.claims_as::<AuthCodeGrant>() {
        Ok(grant) => grant.auth_code,
        Err(e) => {
            warn!(error = %e, "authorization code envelope had an unexpected shape");
            None
        }
    }
}
