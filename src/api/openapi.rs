//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI document for the media-syncer HTTP API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-syncer HTTP API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-syncer API",
        version = "0.1.0",
        description = "Batch download of post images and post bundles, served back under /downloads",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        crate::api::routes::root,
        crate::api::routes::openapi_spec,
        crate::api::routes::bulk_image,
        crate::api::routes::bulk_post,
    ),
    components(schemas(
        crate::types::RecordInput,
        crate::types::AssetDescriptor,
        crate::api::routes::MessageResponse,
        crate::api::routes::ArchiveResponse,
        crate::api::routes::ImagesResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "bulk", description = "Batch downloads - single images or whole posts"),
        (name = "system", description = "System endpoints - root message and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
