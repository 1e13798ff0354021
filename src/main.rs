// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr};

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oauth_broker::api::router;
use oauth_broker::config::Settings;
use oauth_broker::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let settings = Settings::from_env().expect("Failed to load configuration");
    let state = AppState::new(&settings).expect("Failed to build application state");
    let app = router(state.clone());

    // Keep the service token fresh so requests never wait on a renewal.
    let shutdown = CancellationToken::new();
    tokio::spawn(state.tokens.clone().run(shutdown.clone()));

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    info!(authority = %settings.base_url, %addr, "oauth-broker listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
                shutdown.cancel();
            }
        })
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
