// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User resolution: from validated credentials to a role/group identity.
//!
//! Resolution runs only for requests whose bearer token survived
//! cross-validation. The authority's user record is fetched live, its raw
//! grant integers go through [`PermissionState::from_grant`], and only
//! effective grants (`Allow`/`Deny`) are kept - an `Unset` outcome carries no
//! decision in this scope. A user with no effective grants is *not* an
//! authenticated identity; resolution fails and the caller falls back to
//! [`ResolvedUser::Anonymous`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

use crate::oauth::{AuthError, AuthorityOperation};
use crate::state::AppState;

use super::extractor::{BearerClaims, RequestCredentials};
use super::roles::PermissionState;

/// Identity of a validated user in one scope.
///
/// Plain data; the hosting application wraps it in whatever user abstraction
/// it uses. Invariant: `roles` is never empty - an identity without effective
/// grants is never constructed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidatedIdentity {
    /// Login the authority validated.
    pub login: String,
    /// Human-readable name from the user record.
    pub display_name: String,
    /// Effective role grants in the request's scope.
    pub roles: HashMap<String, PermissionState>,
    /// Groups the user is a member of.
    pub groups: HashSet<String>,
}

/// Outcome of identity resolution for a request.
#[derive(Debug, Clone)]
pub enum ResolvedUser {
    /// No trusted credentials; the designed degradation path, not an error.
    Anonymous,
    Authenticated(ValidatedIdentity),
}

impl ResolvedUser {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, ResolvedUser::Anonymous)
    }
}

/// Claims of a `getUser` envelope.
#[derive(Debug, Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    result: Option<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default)]
    roles: HashMap<String, Value>,
    #[serde(default)]
    groups: HashMap<String, Value>,
    #[serde(default)]
    name: String,
}

/// Resolve credentials into a user, falling back to anonymous.
///
/// `UnknownUser` and `NoRolesInScope` are expected outcomes for live traffic
/// (record deleted, grants revoked); they degrade rather than fail the
/// request.
pub async fn resolve_identity(
    state: &AppState,
    credentials: &RequestCredentials,
    scope: &str,
) -> ResolvedUser {
    let (Some(claims), Some(login)) = (
        credentials.claims.as_ref(),
        credentials.validated_login.as_deref(),
    ) else {
        return ResolvedUser::Anonymous;
    };

    match resolve_user(state, claims, login, scope).await {
        Ok(identity) => ResolvedUser::Authenticated(identity),
        Err(e) => {
            warn!(%login, scope, error = %e, "identity resolution failed; using anonymous");
            ResolvedUser::Anonymous
        }
    }
}

/// Fetch the authority's user record and map it into an identity.
pub async fn resolve_user(
    state: &AppState,
    claims: &BearerClaims,
    login: &str,
    scope: &str,
) -> Result<ValidatedIdentity, AuthError> {
    let service = state.tokens.current_token().await?;
    let envelope = state
        .transport
        .call(
            AuthorityOperation::GetUser,
            &[
                ("service_token", service.value()),
                ("user_token", &claims.token),
                ("scope", scope),
                ("user", login),
            ],
        )
        .await?;

    let user: UserEnvelope = envelope.claims_as()?;
    let Some(record) = user.result else {
        return Err(AuthError::UnknownUser(login.to_string()));
    };

    let roles: HashMap<String, PermissionState> = record
        .roles
        .iter()
        .filter_map(|(role, raw)| {
            let grant = raw
                .as_i64()
                .map(PermissionState::from_grant)
                .unwrap_or(PermissionState::Unset);
            grant.is_effective().then(|| (role.clone(), grant))
        })
        .collect();

    if roles.is_empty() {
        warn!(%login, scope, "user has no effective roles in this scope");
        return Err(AuthError::NoRolesInScope(scope.to_string()));
    }

    let groups = record
        .groups
        .iter()
        .filter(|(_, member)| is_truthy(member))
        .map(|(group, _)| group.clone())
        .collect();

    Ok(ValidatedIdentity {
        login: login.to_string(),
        display_name: record.name,
        roles,
        groups,
    })
}

/// Membership flags arrive as whatever the authority stored: booleans,
/// integers, occasionally strings.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
