// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod credentials;
pub mod health;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/@authorization-code", get(credentials::get_auth_code))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        credentials::get_auth_code,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            credentials::AuthCodeResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Credentials", description = "Authorization-code brokering"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
