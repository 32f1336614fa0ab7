//! System handlers: root message and OpenAPI document.

use axum::{Json, response::IntoResponse};

use super::MessageResponse;

/// GET / - Root message
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", body = MessageResponse)
    )
)]
pub async fn root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "this is the root of the API".to_string(),
    })
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
