//! Integration tests for request framing on `/upload`.

mod helpers;

use axum::http::StatusCode;
use helpers::TestApp;

#[tokio::test]
async fn test_missing_boundary_is_400() {
    let app = TestApp::new();
    let body = helpers::multipart_body(&[helpers::Part::file("file", "b.kicad_pcb", b"x")]);

    let response = app.upload_raw(body, "multipart/form-data").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["code"], "MALFORMED_REQUEST");
    assert!(app.workspaces().is_empty());
}

#[tokio::test]
async fn test_non_multipart_is_400() {
    let app = TestApp::new();

    let response = app
        .upload_raw(b"file=board.kicad_pcb".to_vec(), "application/x-www-form-urlencoded")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Invalid content type");
}

#[tokio::test]
async fn test_part_without_header_terminator_is_400() {
    let app = TestApp::new();
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"b.kicad_pcb\"\r\n--{b}--\r\n",
        b = helpers::BOUNDARY
    );

    let response = app
        .upload_raw(body.into_bytes(), &helpers::form_content_type())
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.workspaces().is_empty());
}

#[tokio::test]
async fn test_upload_over_limit_is_413() {
    let base = tempfile::tempdir().expect("tempdir");
    let mut config = ibom_core::config::AppConfig::default();
    config.server.max_upload_size_bytes = 1024;
    config.workspace.base_dir = Some(base.path().to_path_buf());
    let app = ibom_api::build_app(ibom_api::AppState::from_config(config, 8080));

    let big = vec![b'x'; 4096];
    let body = helpers::multipart_body(&[helpers::Part::file("file", "b.kicad_pcb", &big)]);
    let request = axum::http::Request::post("/upload")
        .header(axum::http::header::CONTENT_TYPE, helpers::form_content_type())
        .body(axum::body::Body::from(body))
        .expect("request");

    use tower::ServiceExt;
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
