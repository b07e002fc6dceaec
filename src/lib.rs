//! ReaDefy
//!
//! PDF study companion: the annotation engine of the viewer plus the small
//! auth and chat backend it talks to.
//!
//! # Modules
//!
//! - `fingerprint`: stable content identifiers for document bytes
//! - `annotations`: highlights, drawings, the per-page layer and the store
//! - `storage`: key-value persistence seams (memory and SQLite)
//! - `viewer`: document intake and the viewing session
//! - `client`: auth session and chat client for the HTTP API
//! - `db`, `auth`, `routes`: the backend served by `readefy-server`

pub mod annotations;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod routes;
pub mod state;
pub mod storage;
pub mod viewer;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the HTTP application
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config().server.cors_origin.as_deref());

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .nest("/api/auth", routes::auth::router())
        .nest("/api/chat", routes::chat::router())
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Invalid CORS origin, allowing any origin");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
