// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tri-state permission grants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a role grant in a scope.
///
/// The authority encodes grants as integers in its user records; the mapping
/// is `1` → `Allow`, `0` → `Deny`, anything else → `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The role is granted.
    Allow,
    /// The role is explicitly denied.
    Deny,
    /// No decision recorded for this role.
    Unset,
}

impl PermissionState {
    /// Map a raw grant integer from the authority. Total: unknown values are
    /// `Unset`, never an error.
    pub fn from_grant(raw: i64) -> Self {
        match raw {
            1 => PermissionState::Allow,
            0 => PermissionState::Deny,
            _ => PermissionState::Unset,
        }
    }

    /// Whether this state carries an actual decision (`Allow` or `Deny`).
    pub fn is_effective(&self) -> bool {
        !matches!(self, PermissionState::Unset)
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Allow => write!(f, "allow"),
            PermissionState::Deny => write!(f, "deny"),
            PermissionState::Unset => write!(f, "unset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_integers_map_to_tri_state() {
        assert_eq!(PermissionState::from_grant(1), PermissionState::Allow);
        assert_eq!(PermissionState::from_grant(0), PermissionState::Deny);
        assert_eq!(PermissionState::from_grant(2), PermissionState::Unset);
        assert_eq!(PermissionState::from_grant(-1), PermissionState::Unset);
        assert_eq!(PermissionState::from_grant(i64::MAX), PermissionState::Unset);
    }

    #[test]
    fn only_allow_and_deny_are_effective() {
        assert!(PermissionState::Allow.is_effective());
        assert!(PermissionState::Deny.is_effective());
        assert!(!PermissionState::Unset.is_effective());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PermissionState::Allow).unwrap(),
            "\"allow\""
        );
    }
}
