//! Integration tests for the upload pipeline over HTTP.

mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use helpers::{ConverterMode, FakeConverter, FakeParser, Part, TestApp};

#[tokio::test]
async fn test_upload_kicad_board() {
    let app = TestApp::new();

    let response = app.upload("board.kicad_pcb", b"(kicad_pcb (version 1))").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "board_iBoM.html");
    assert_eq!(body["url"], "http://localhost:8080/generated/board_iBoM.html");
    assert_eq!(body["message"], "Successfully generated BOM with 3 components");

    let file_path = body["file_path"].as_str().expect("file_path");
    assert!(std::path::Path::new(file_path).is_file());
    assert_eq!(body["file_url"], format!("file://{file_path}"));
}

#[tokio::test]
async fn test_upload_saves_exact_bytes_under_basename() {
    let parser = Arc::new(FakeParser::with_components(1));
    let app = TestApp::with(
        Arc::new(FakeConverter::new(ConverterMode::Succeed)),
        parser.clone(),
    );
    let payload: Vec<u8> = (0u8..=255).chain(b"\r\n\r\n--tail".iter().copied()).collect();

    let response = app.upload("../../etc/evil.kicad_pcb", &payload).await;
    assert_eq!(response.status, StatusCode::OK);

    let seen = parser.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].file_name().expect("name"), "evil.kicad_pcb");
    assert!(seen[0].starts_with(app.base.path()));
    assert_eq!(std::fs::read(&seen[0]).expect("read upload"), payload);
}

#[tokio::test]
async fn test_altium_upload_is_converted_first() {
    let converter = Arc::new(FakeConverter::new(ConverterMode::Succeed));
    let parser = Arc::new(FakeParser::with_components(2));
    let app = TestApp::with(converter.clone(), parser.clone());

    let response = app.upload("Main.PcbDoc", b"altium").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["filename"], "Main_iBoM.html");
    assert_eq!(converter.calls(), 1);
    assert_eq!(
        parser.seen()[0].extension().expect("ext"),
        "kicad_pcb"
    );
}

#[tokio::test]
async fn test_unsupported_extension() {
    let converter = Arc::new(FakeConverter::new(ConverterMode::Succeed));
    let parser = Arc::new(FakeParser::with_components(3));
    let app = TestApp::with(converter.clone(), parser.clone());

    let response = app.upload("notes.unsupported_ext", b"hello").await;

    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = response.json();
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().expect("error");
    assert!(error.contains(".unsupported_ext"));
    assert!(error.contains(".PcbDoc"));
    assert!(error.contains(".kicad_pcb"));

    assert_eq!(converter.calls(), 0);
    assert_eq!(parser.calls(), 0);

    let workspaces = app.workspaces();
    assert_eq!(workspaces.len(), 1);
    let output = workspaces[0].join("output");
    assert_eq!(std::fs::read_dir(&output).expect("output dir").count(), 0);
}

#[tokio::test]
async fn test_toolchain_unavailable_is_503() {
    let app = TestApp::with(
        Arc::new(FakeConverter::new(ConverterMode::Unavailable)),
        Arc::new(FakeParser::with_components(3)),
    );

    let response = app.upload("board.PcbDoc", b"altium").await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().expect("error").contains("altium2kicad"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_interpreter_leaves_no_scratch_dir() {
    use ibom_core::config::ConverterConfig;
    use plugin_altium_converter::AltiumConverter;

    let scratch = tempfile::tempdir().expect("tempdir");
    let converter = AltiumConverter::new(ConverterConfig {
        interpreter: "/nonexistent/perl".to_string(),
        ..ConverterConfig::default()
    })
    .with_scratch_root(scratch.path());
    let parser = Arc::new(FakeParser::with_components(3));
    let app = TestApp::with(Arc::new(converter), parser.clone());

    let response = app.upload("board.PcbDoc", b"altium").await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json()["success"], false);
    assert_eq!(std::fs::read_dir(scratch.path()).expect("scratch").count(), 0);
    assert_eq!(parser.calls(), 0);
}

#[tokio::test]
async fn test_board_without_components_is_422() {
    let app = TestApp::with(
        Arc::new(FakeConverter::new(ConverterMode::Succeed)),
        Arc::new(FakeParser::with_components(0)),
    );

    let response = app.upload("empty.kicad_pcb", b"(kicad_pcb)").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["success"], false);
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = TestApp::new();
    let body = helpers::multipart_body(&[Part::text("temp_dir", "x")]);

    let response = app.upload_raw(body, &helpers::form_content_type()).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "No file uploaded");
    assert!(app.workspaces().is_empty());
}

#[tokio::test]
async fn test_empty_filename() {
    let app = TestApp::new();
    let body = helpers::multipart_body(&[Part::file("file", "", b"")]);

    let response = app.upload_raw(body, &helpers::form_content_type()).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "No file selected");
}

#[tokio::test]
async fn test_relative_temp_dir_is_created_under_base() {
    let app = TestApp::new();
    let body = helpers::multipart_body(&[
        Part::text("temp_dir", "nested/runs"),
        Part::file("file", "board.kicad_pcb", b"(kicad_pcb)"),
    ]);

    let response = app.upload_raw(body, &helpers::form_content_type()).await;
    assert_eq!(response.status, StatusCode::OK);

    let status = app.get("/status").await.json();
    let temp_dir = status["temp_dir"].as_str().expect("temp_dir");
    assert!(std::path::Path::new(temp_dir).starts_with(app.base.path().join("nested/runs")));
    assert_eq!(
        status["output_dir"].as_str().expect("output_dir"),
        std::path::Path::new(temp_dir).join("output").to_str().expect("utf-8")
    );
}

#[tokio::test]
async fn test_relative_base_hands_absolute_paths_downstream() {
    let relative = tempfile::tempdir_in(".").expect("tempdir");
    assert!(relative.path().is_relative());
    let parser = Arc::new(FakeParser::with_components(2));
    let relative_base = relative.path().to_path_buf();
    let app = TestApp::configured(
        Arc::new(FakeConverter::new(ConverterMode::Succeed)),
        parser.clone(),
        move |config| config.workspace.relative_base = relative_base,
    );

    let body = helpers::multipart_body(&[
        Part::text("temp_dir", "runs"),
        Part::file("file", "board.kicad_pcb", b"(kicad_pcb)"),
    ]);
    let response = app.upload_raw(body, &helpers::form_content_type()).await;
    assert_eq!(response.status, StatusCode::OK);

    let seen = parser.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_absolute());
    let expected_base = std::path::absolute(relative.path().join("runs")).expect("absolute");
    assert!(seen[0].starts_with(&expected_base));
    let file_path = response.json()["file_path"].as_str().expect("file_path").to_string();
    assert!(std::path::Path::new(&file_path).is_absolute());
}
