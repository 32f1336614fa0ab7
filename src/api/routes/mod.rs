//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`bulk`] - batch image and post downloads
//! - [`system`] - root message and OpenAPI document

use serde::Serialize;

use crate::types::AssetDescriptor;

mod bulk;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use bulk::*;
pub use system::*;

// ============================================================================
// Response Types (shared across handlers)
// ============================================================================

/// Body of `GET /`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Greeting text
    #[schema(example = "this is the root of the API")]
    pub message: String,
}

/// Body of a successful `POST /bulk/post`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ArchiveResponse {
    /// Public URL of the zip archive
    #[schema(example = "http://localhost:8000/downloads/3f2c9a0e-2b7e-4d8e-9f59-0b8a5d1f7a11.zip")]
    pub data: String,
}

/// Body of a successful `POST /bulk/image`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ImagesResponse {
    /// One descriptor per distinct record id, in order of first appearance
    pub data: Vec<AssetDescriptor>,
}
