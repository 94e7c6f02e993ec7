//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the chunk-assembler REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the chunk-assembler REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "chunk-assembler REST API",
        version = "0.1.0",
        description = "REST API for uploading files in chunks and merging them into final artifacts",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8090", description = "Local development server")
    ),
    paths(
        // Uploads
        crate::api::routes::upload_chunk,
        crate::api::routes::merge_transfer,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ChunkUpload,
        crate::types::MergeRequest,
        crate::types::FinalArtifact,

        // Config types from config.rs
        crate::config::Config,
        crate::config::StorageConfig,
        crate::config::ApiConfig,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "uploads", description = "Chunk ingest and merge - upload numbered chunks, then assemble them"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
