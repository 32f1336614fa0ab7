use super::*;
use crate::downloader::test_helpers::Harness;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;


/// Router over a fresh harness; keep the harness alive for the temp dir
fn test_app(limit: usize) -> (Router, Harness) {
    let harness = Harness::new(limit);
    let config = harness.downloader.config.clone();
    let app = create_router(Arc::new(harness.downloader.clone()), config);
    (app, harness)
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_message() {
    let (app, _harness) = test_app(10);

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "this is the root of the API");
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _harness) = test_app(10);

    let response = app.oneshot(get("/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/bulk/image"].is_object());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _harness) = test_app(10);

    let request = Request::builder()
        .uri("/")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_swagger_ui_disabled_by_default() {
    let (app, _harness) = test_app(10);
    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_mount_serves_data_dir() {
    let (app, harness) = test_app(10);
    let dir = harness.data_dir().join("images/ABC");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ABC.jpg"), b"pixels").unwrap();

    let response = app
        .clone()
        .oneshot(get("/downloads/images/ABC/ABC.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"pixels");

    let missing = app
        .oneshot(get("/downloads/images/NOPE/NOPE.jpg"))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_cors_layer_with_specific_origins() {
    // Unparseable origins are dropped rather than failing the build
    let _layer = build_cors_layer(&[
        "http://localhost:3000".to_string(),
        "not a header\n".to_string(),
    ]);
}
