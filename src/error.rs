//! Error types for media-syncer
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants for each pipeline stage
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-syncer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to API clients for any server-side failure.
///
/// The underlying error is logged, never sent over the wire.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Main error type for media-syncer
#[derive(Debug, Error)]
pub enum Error {
    /// The tabular data source could not be reached or rejected the request
    #[error("record source unavailable: {0}")]
    SourceUnavailable(String),

    /// Media introspection failed for a shortcode (timeout, not found, bad payload)
    #[error("failed to resolve media for shortcode {shortcode}: {reason}")]
    ResolutionFailed {
        /// Shortcode that was being resolved
        shortcode: String,
        /// Why resolution failed
        reason: String,
    },

    /// The requested sub-image index does not exist in the post
    #[error(
        "invalid img_index {index} for post with shortcode {shortcode} ({available} media available)"
    )]
    InvalidIndex {
        /// Shortcode of the post
        shortcode: String,
        /// Requested 1-based index
        index: u32,
        /// Number of media nodes in the post
        available: usize,
    },

    /// Batch is larger than the configured per-run ceiling
    #[error("exceeded the maximum limit of {limit} images (requested {requested})")]
    LimitExceeded {
        /// Number of items in the rejected batch
        requested: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Downstream platform rejected a descriptor
    #[error("publishing asset {external_id} failed with status {status}")]
    PublishFailure {
        /// External identifier of the rejected descriptor
        external_id: String,
        /// HTTP status returned by the platform
        status: u16,
        /// Response body returned by the platform
        body: String,
    },

    /// Persist target already exists and overwriting was not allowed
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// State machine trigger is not valid from the current state
    #[error("cannot {trigger} from state {from}")]
    InvalidTransition {
        /// State the orchestrator was in
        from: String,
        /// Trigger that was attempted
        trigger: String,
    },

    /// Input failed validation (request body, record fields)
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "PAGE_SIZE")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Archive packaging error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error belongs to a single item rather than the whole batch.
    ///
    /// Automated runs log and skip item errors; request-driven batches abort on them.
    pub fn is_item_error(&self) -> bool {
        matches!(
            self,
            Error::ResolutionFailed { .. }
                | Error::InvalidIndex { .. }
                | Error::PublishFailure { .. }
                | Error::Network(_)
        )
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "limit_exceeded",
///     "message": "exceeded the maximum limit of 50 images (requested 51)",
///     "details": { "requested": 51, "limit": 50 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "limit_exceeded", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error" with the generic message
    pub fn internal() -> Self {
        Self::new("internal_error", GENERIC_ERROR_MESSAGE)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - the batch or one of its items cannot be served
            Error::LimitExceeded { .. } => 400,
            Error::InvalidIndex { .. } => 400,
            Error::ResolutionFailed { .. } => 400,
            Error::Validation(_) => 400,
            Error::Config { .. } => 400,

            // 409 Conflict
            Error::DestinationExists(_) => 409,
            Error::InvalidTransition { .. } => 409,

            // 502 Bad Gateway - external service errors
            Error::SourceUnavailable(_) => 502,
            Error::PublishFailure { .. } => 502,
            Error::Network(_) => 502,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Archive(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::SourceUnavailable(_) => "source_unavailable",
            Error::ResolutionFailed { .. } => "resolution_failed",
            Error::InvalidIndex { .. } => "invalid_index",
            Error::LimitExceeded { .. } => "limit_exceeded",
            Error::PublishFailure { .. } => "publish_failure",
            Error::DestinationExists(_) => "destination_exists",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Validation(_) => "validation_error",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Archive(_) => "archive_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        // Server-side failures never leak their internals
        if error.status_code() >= 500 {
            return ApiError::internal();
        }

        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::LimitExceeded { requested, limit } => Some(serde_json::json!({
                "requested": requested,
                "limit": limit,
            })),
            Error::InvalidIndex {
                shortcode,
                index,
                available,
            } => Some(serde_json::json!({
                "shortcode": shortcode,
                "img_index": index,
                "available": available,
            })),
            Error::ResolutionFailed { shortcode, .. } => Some(serde_json::json!({
                "shortcode": shortcode,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
