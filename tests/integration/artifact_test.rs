//! Integration tests for serving and cleaning up generated artifacts.

mod helpers;

use axum::http::{StatusCode, header};
use helpers::TestApp;

#[tokio::test]
async fn test_generated_artifact_round_trip() {
    let app = TestApp::new();

    let upload = app.upload("board.kicad_pcb", b"(kicad_pcb)").await.json();
    let file_path = upload["file_path"].as_str().expect("file_path").to_string();
    let on_disk = std::fs::read(&file_path).expect("artifact on disk");

    let response = app.get("/generated/board_iBoM.html").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, on_disk);
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(
        response.headers[header::CONTENT_LENGTH],
        on_disk.len().to_string().as_str()
    );

    let cleanup = app.post("/cleanup").await;
    assert_eq!(cleanup.status, StatusCode::OK);
    assert_eq!(cleanup.json()["success"], true);
    assert!(!std::path::Path::new(&file_path).exists());

    let gone = app.get("/generated/board_iBoM.html").await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.json()["success"], false);

    let status = app.get("/status").await.json();
    assert!(status["temp_dir"].is_null());
}

#[tokio::test]
async fn test_unknown_artifact_is_404() {
    let app = TestApp::new();
    let response = app.get("/generated/missing_iBoM.html").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_encoded_traversal_is_reduced_to_basename() {
    let app = TestApp::new();
    app.upload("board.kicad_pcb", b"(kicad_pcb)").await;

    let response = app.get("/generated/..%2F..%2Fboard_iBoM.html").await;
    assert_eq!(response.status, StatusCode::OK);

    let outside = app.get("/generated/..%2Fboard.kicad_pcb").await;
    assert_eq!(outside.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_artifact_found_by_scan_after_registry_miss() {
    let app = TestApp::new();
    let workspace = app.base.path().join("bom_manual");
    std::fs::create_dir_all(workspace.join("output")).expect("mkdir");
    std::fs::write(workspace.join("output/legacy_iBoM.html"), "<html></html>").expect("write");

    let response = app.get("/generated/legacy_iBoM.html").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, b"<html></html>");
}

#[tokio::test]
async fn test_concurrent_uploads_are_all_served() {
    let app = TestApp::new();
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let router = app.router.clone();
        tasks.spawn(async move {
            use tower::ServiceExt;
            let body = helpers::multipart_body(&[helpers::Part::file(
                "file",
                &format!("board{i}.kicad_pcb"),
                b"(kicad_pcb)",
            )]);
            let request = axum::http::Request::post("/upload")
                .header(header::CONTENT_TYPE, helpers::form_content_type())
                .body(axum::body::Body::from(body))
                .expect("request");
            router.oneshot(request).await.expect("response").status()
        });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.expect("task"), StatusCode::OK);
    }

    for i in 0..8 {
        let response = app.get(&format!("/generated/board{i}_iBoM.html")).await;
        assert_eq!(response.status, StatusCode::OK, "board{i}");
    }
    assert_eq!(app.workspaces().len(), 8);
}

#[tokio::test]
async fn test_unknown_route_is_404_json() {
    let app = TestApp::new();
    let response = app.get("/api/anything").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["success"], false);
}
