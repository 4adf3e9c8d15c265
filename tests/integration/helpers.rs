//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ibom_api::{AppState, build_app};
use ibom_core::config::AppConfig;
use ibom_service::{BackendError, BoardParser, Component, HtmlBomGenerator, ParsedBoard};
use plugin_altium_converter::{
    ConversionError, ConversionMetrics, ConvertedBoard, SourceConverter,
};

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "----ibomTestBoundary7MA4YWxk";

/// Parser stand-in that reports a fixed number of components.
#[derive(Default)]
pub struct FakeParser {
    components: usize,
    calls: AtomicUsize,
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeParser {
    /// Parser reporting `components` resistors.
    pub fn with_components(components: usize) -> Self {
        Self {
            components,
            ..Self::default()
        }
    }

    /// Number of parse calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Boards passed to the parser, in call order.
    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl BoardParser for FakeParser {
    async fn parse(&self, board: &Path) -> Result<Option<ParsedBoard>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().expect("lock").push(board.to_path_buf());
        let components = (1..=self.components)
            .map(|i| Component {
                reference: format!("R{i}"),
                val: "10k".to_string(),
                footprint: "R_0603".to_string(),
                layer: if i % 2 == 0 { "B" } else { "F" }.to_string(),
                attr: None,
                extra_fields: BTreeMap::new(),
            })
            .collect();
        Ok(Some(ParsedBoard {
            board_data: serde_json::json!({ "metadata": { "title": "test" } }),
            components,
        }))
    }
}

/// How [`FakeConverter`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterMode {
    /// Write `<stem>.kicad_pcb` next to the source.
    Succeed,
    /// Report that no toolchain exists.
    Unavailable,
}

/// Converter stand-in.
pub struct FakeConverter {
    mode: ConverterMode,
    calls: AtomicUsize,
}

impl FakeConverter {
    /// Converter answering with `mode`.
    pub fn new(mode: ConverterMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of convert calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceConverter for FakeConverter {
    async fn convert(&self, source: &Path) -> Result<ConvertedBoard, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            ConverterMode::Succeed => {
                let path = source.with_extension("kicad_pcb");
                tokio::fs::write(&path, "(kicad_pcb)").await?;
                Ok(ConvertedBoard {
                    path,
                    reused_cached: false,
                })
            }
            ConverterMode::Unavailable => Err(ConversionError::ToolchainNotFound {
                searched: vec![PathBuf::from("/opt/altium2kicad")],
            }),
        }
    }
}

/// Buffered response.
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// Body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).expect("JSON body")
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state behind the router
    pub state: AppState,
    /// Workspace base and scan root
    pub base: TempDir,
}

impl TestApp {
    /// App over a fake converter and a parser reporting three components.
    pub fn new() -> Self {
        Self::with(
            Arc::new(FakeConverter::new(ConverterMode::Succeed)),
            Arc::new(FakeParser::with_components(3)),
        )
    }

    /// App over the given converter and parser, with the real HTML
    /// generator.
    pub fn with(converter: Arc<dyn SourceConverter>, parser: Arc<dyn BoardParser>) -> Self {
        Self::configured(converter, parser, |_| {})
    }

    /// Like [`TestApp::with`], letting `adjust` edit the configuration last.
    pub fn configured(
        converter: Arc<dyn SourceConverter>,
        parser: Arc<dyn BoardParser>,
        adjust: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let base = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.workspace.base_dir = Some(base.path().to_path_buf());
        config.workspace.scan_root = Some(base.path().to_path_buf());
        config.workspace.relative_base = base.path().to_path_buf();
        config.server.open_browser = false;
        adjust(&mut config);

        let generator = Arc::new(HtmlBomGenerator::new(config.generator.clone()));
        let state = AppState::with_collaborators(
            config,
            converter,
            parser,
            generator,
            Arc::new(ConversionMetrics::new()),
            8080,
        );

        Self {
            router: build_app(state.clone()),
            state,
            base,
        }
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    /// GET `uri`.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Request::get(uri).body(Body::empty()).expect("request"))
            .await
    }

    /// POST `uri` with an empty body.
    pub async fn post(&self, uri: &str) -> TestResponse {
        self.request(Request::post(uri).body(Body::empty()).expect("request"))
            .await
    }

    /// POST a multipart body to `/upload`.
    pub async fn upload_raw(&self, body: Vec<u8>, content_type: &str) -> TestResponse {
        let request = Request::post("/upload")
            .header(header::HOST, "localhost:8080")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("request");
        self.request(request).await
    }

    /// Upload a single file in the `file` field.
    pub async fn upload(&self, filename: &str, data: &[u8]) -> TestResponse {
        let body = multipart_body(&[Part::file("file", filename, data)]);
        self.upload_raw(body, &form_content_type()).await
    }

    /// Workspace directories created under the base.
    pub fn workspaces(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(self.base.path())
            .expect("read base")
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

/// One multipart part.
pub struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    /// File part.
    pub fn file(name: &'a str, filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            data,
        }
    }

    /// Scalar part.
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            data: value.as_bytes(),
        }
    }
}

/// `Content-Type` header for [`multipart_body`].
pub fn form_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Encode parts the way browsers do.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
