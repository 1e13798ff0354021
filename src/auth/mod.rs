// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Authentication
//!
//! Per-request credential handling for the hosting application.
//!
//! ## Flow
//!
//! 1. The hosting framework attaches a [`RequestScope`] extension to each
//!    request.
//! 2. [`extractor`] pulls the bearer token, decodes it locally, and
//!    cross-validates it against the authority (anti-substitution check
//!    included).
//! 3. [`identity`] fetches the validated user's record and maps its grants
//!    through [`roles::PermissionState`].
//!
//! Every failure along the way degrades to [`identity::ResolvedUser::Anonymous`];
//! authentication problems never fail the request itself.

pub mod extractor;
pub mod identity;
pub mod roles;

pub use extractor::{extract_credentials, BearerClaims, CurrentUser, RequestCredentials, RequestScope};
pub use identity::{resolve_identity, resolve_user, ResolvedUser, ValidatedIdentity};
pub use roles::PermissionState;
