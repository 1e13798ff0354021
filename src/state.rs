// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Components are passed explicitly through this state (and on into axum's
//! `State`/extractors); nothing is looked up through a global registry.

use std::sync::Arc;

use crate::config::Settings;
use crate::oauth::{AuthError, AuthTransport, ServiceTokenManager, TokenCodec};

#[derive(Clone)]
pub struct AppState {
    /// HTTP transport to the configured authority.
    pub transport: Arc<AuthTransport>,
    /// Owner of the process-wide service token.
    pub tokens: Arc<ServiceTokenManager>,
    /// Default client id for the auth-code endpoint.
    pub client_id: String,
}

impl AppState {
    pub fn new(settings: &Settings) -> Result<Self, AuthError> {
        let codec = TokenCodec::new(&settings.jwt_secret, settings.jwt_algorithm);
        let transport = Arc::new(AuthTransport::new(
            settings.base_url.clone(),
            codec,
            settings.http_timeout,
        )?);
        let tokens = Arc::new(ServiceTokenManager::new(
            transport.clone(),
            settings.client_id.clone(),
            settings.client_secret.clone(),
        ));

        Ok(Self {
            transport,
            tokens,
            client_id: settings.client_id.clone(),
        })
    }
}
