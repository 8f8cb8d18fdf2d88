//! # dbank-api — Axum REST API for the dbank Banking Domain
//!
//! ## API Surface
//!
//! | Prefix           | Module                  | Domain                    |
//! |------------------|-------------------------|---------------------------|
//! | `/accounts/*`    | [`routes::accounts`]    | Bank accounts             |
//! | `/cards/*`       | [`routes::cards`]       | Payment cards + checks    |
//! | `/operations/*`  | [`routes::operations`]  | Transfers + confirmation  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! `/health`, `/metrics`, and `/openapi.json` are mounted outside the
//! auth middleware so they remain reachable without forwarded identity
//! headers.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod links;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    // Authenticated API routes. Auth runs innermost so unauthenticated
    // requests still show up in the request metrics.
    let api = Router::new()
        .merge(routes::accounts::router())
        .merge(routes::cards::router())
        .merge(routes::operations::router())
        .layer(axum::middleware::from_fn(auth::authenticate));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(serve_metrics))
        .route("/openapi.json", get(serve_openapi))
        .merge(api)
        .layer(axum::middleware::from_fn(
            middleware::metrics::track_http,
        ))
        .layer(Extension(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn serve_metrics(Extension(metrics): Extension<ApiMetrics>) -> String {
    metrics.render()
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}
