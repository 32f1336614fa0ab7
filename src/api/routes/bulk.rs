//! Batch download handlers.
//!
//! Both endpoints abort on the first item that cannot be resolved, so the
//! caller gets a 400 naming the offending record instead of a partial result.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{ArchiveResponse, ImagesResponse};
use crate::api::AppState;
use crate::api::error_response::rejection_response;
use crate::downloader::FailurePolicy;
use crate::types::Record;

/// POST /bulk/image - Download one image per record
#[utoipa::path(
    post,
    path = "/bulk/image",
    tag = "bulk",
    request_body = Vec<crate::types::RecordInput>,
    responses(
        (status = 200, description = "Descriptors of the downloaded images", body = ImagesResponse),
        (status = 400, description = "Invalid body, unresolvable record, bad img_index or batch over the limit", body = crate::error::ApiError),
        (status = 502, description = "Media service or CDN failure", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn bulk_image(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Record>>, JsonRejection>,
) -> Response {
    let records = match payload {
        Ok(Json(records)) => records,
        Err(rejection) => return rejection_response(rejection),
    };

    tracing::info!(items = records.len(), "bulk image request");

    match state
        .downloader
        .download_images(&records, FailurePolicy::Abort)
        .await
    {
        Ok(descriptors) => (StatusCode::OK, Json(ImagesResponse { data: descriptors })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /bulk/post - Download every post bundle and zip them
#[utoipa::path(
    post,
    path = "/bulk/post",
    tag = "bulk",
    request_body = Vec<crate::types::RecordInput>,
    responses(
        (status = 200, description = "URL of the archive holding all post bundles", body = ArchiveResponse),
        (status = 400, description = "Invalid body, unresolvable record or batch over the limit", body = crate::error::ApiError),
        (status = 502, description = "Media service or CDN failure", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn bulk_post(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Record>>, JsonRejection>,
) -> Response {
    let records = match payload {
        Ok(Json(records)) => records,
        Err(rejection) => return rejection_response(rejection),
    };

    tracing::info!(items = records.len(), "bulk post request");

    match state.downloader.download_posts(&records).await {
        Ok(report) => {
            if !report.failed.is_empty() {
                tracing::warn!(failed = ?report.failed, "some posts were left out of the archive");
            }
            (
                StatusCode::OK,
                Json(ArchiveResponse {
                    data: report.archive_url,
                }),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
