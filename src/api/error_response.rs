//! HTTP error response handling for the API
//!
//! Converts domain errors and request rejections into JSON error bodies with
//! matching status codes.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // The client only sees the generic message for these
        if status_code.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "request rejected");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// 400 `validation_error` for a body that is not a list of valid records
pub fn rejection_response(rejection: JsonRejection) -> Response {
    let message = rejection.body_text();
    tracing::warn!(status = %rejection.status(), message = %message, "rejected request body");

    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::validation(message)),
    )
        .into_response()
}
