//! Route definitions for the Punchgate HTTP API.
//!
//! Routes are organized by domain. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    Router::new()
        .merge(attendance_routes(&state))
        .merge(sync_routes())
        .merge(auth_routes())
        .merge(health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Ingestion endpoints: clock, batch, status, pending. Rate limited.
fn attendance_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/attendance/clock", post(handlers::attendance::clock))
        .route("/attendance/batch", post(handlers::attendance::batch))
        .route(
            "/attendance/status/{record_id}",
            get(handlers::attendance::status),
        )
        .route("/attendance/pending", get(handlers::attendance::pending))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::ingest_rate_limit,
        ))
}

/// Forwarder control endpoints.
fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/sync/trigger", post(handlers::sync::trigger))
        .route("/sync/retry", post(handlers::sync::retry))
        .route("/sync/cleanup", post(handlers::sync::cleanup))
        .route("/sync/config", put(handlers::sync::update_config))
        .route("/sync/status", get(handlers::sync::status))
        .route("/sync/batch/{id}", get(handlers::sync::batch_status))
}

/// Session authority endpoints.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/verify", get(handlers::auth::verify))
}

/// Health check endpoints (no auth required).
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Build CORS layer from configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    use http::Method;
    use tower_http::cors::Any;

    let cors_config = &state.config.server.cors;

    let mut cors = CorsLayer::new().allow_headers(Any);

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<http::HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<Method> = cors_config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors.allow_methods(methods)
}
