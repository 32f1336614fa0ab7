//! HTTP API server module
//!
//! Exposes the two batch endpoints, the OpenAPI document and a read-only
//! static mount of the data directory, so every `asset_file_url` handed out
//! can be dereferenced.

use crate::config::STATIC_PREFIX;
use crate::{Config, MediaDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::net::SocketAddr;
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
/// - `GET /` - Root message
/// - `POST /bulk/image` - Download one image per record, returns descriptors
/// - `POST /bulk/post` - Download post bundles, returns the archive URL
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /downloads/*` - Read-only view of the data directory
pub fn create_router(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        .route("/", get(routes::root))
        .route("/bulk/image", post(routes::bulk_image))
        .route("/bulk/post", post(routes::bulk_post))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI gets its own copy of the document so it does not clash with /openapi.json
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .nest_service(STATIC_PREFIX, ServeDir::new(&config.storage.data_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until SIGINT/SIGTERM, then lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use media_syncer::{Config, GraphQlIntrospector, MediaDownloader};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::from_env()?);
/// let introspector = Arc::new(GraphQlIntrospector::new(&config.media)?);
/// let downloader = Arc::new(MediaDownloader::new(config.clone(), introspector)?);
///
/// media_syncer::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(
        address = %bind_address,
        data_dir = %config.storage.data_dir.display(),
        "Starting API server"
    );

    // ServeDir needs the mount point to exist
    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(crate::shutdown_signal())
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
