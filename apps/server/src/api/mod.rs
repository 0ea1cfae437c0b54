//! API layer - routes, handlers, and middleware

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    // Account endpoints stay reachable without a token.
    let patient_router = routes::patients::patient_routes().layer(
        axum::middleware::from_fn_with_state(state.clone(), crate::auth::auth_middleware),
    );
    let bed_router = routes::beds::bed_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        crate::auth::auth_middleware,
    ));

    let api_router = Router::new()
        .merge(routes::accounts::account_routes())
        .nest("/patients", patient_router)
        .nest("/beds", bed_router);

    Router::new()
        .route("/health", get(health_check))
        .merge(routes::metrics::metrics_routes())
        .nest("/api", api_router)
        .fallback(not_found)
        .with_state(state)
        // Middleware (applied in reverse order)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": state.config.logging.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.config.database.backend,
    }))
}

async fn not_found() -> crate::Error {
    crate::Error::not_found("Route")
}
