//! REST API server module
//!
//! Wires the core assembler to HTTP: chunk ingest, merge, health, events,
//! OpenAPI documentation, and read-only retrieval of finished artifacts.

use crate::{Config, Result, UploadAssembler};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Uploads
/// - `POST /uploads/chunks` - Accept one chunk (multipart/form-data)
/// - `POST /uploads/merge` - Merge a completed transfer
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// ## Artifacts
/// - `GET /files/*` - Read-only retrieval of merged artifacts (if enabled)
pub fn create_router(assembler: Arc<UploadAssembler>, config: Arc<Config>) -> Router {
    let state = AppState::new(assembler, config.clone());

    let router = Router::new()
        .route("/uploads/chunks", post(routes::upload_chunk))
        .route("/uploads/merge", post(routes::merge_transfer))
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Read-only static serving of merged artifacts; the assembler core never
    // serves bytes itself.
    let router = if config.api.serve_files {
        router.nest_service("/files", ServeDir::new(&config.storage.final_root))
    } else {
        router
    };

    // The chunk payload plus multipart framing and the text fields
    let body_limit = config.storage.max_chunk_bytes.saturating_add(64 * 1024);

    let router = router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Supports "*" (or an empty list) for any origin, otherwise allows the
/// specific origins listed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|origin| origin == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Binds a TCP listener and serves the router until shutdown or error.
pub async fn start_api_server(assembler: Arc<UploadAssembler>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    let app = create_router(assembler, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
