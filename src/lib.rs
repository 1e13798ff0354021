// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth Broker - Delegated Authentication Service
//!
//! This crate authenticates a hosting application against a single remote
//! OAuth authority: it keeps a process-wide service token fresh, validates
//! inbound bearer tokens (locally and against the authority's live records),
//! and resolves validated users into tri-state role/group identities.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - request credential extraction and identity resolution
//! - `oauth` - authority transport, token codec, and service-token lifecycle
pub mod api;
pub mod auth;
pub mod config;
pub mod oauth;
pub mod state;
