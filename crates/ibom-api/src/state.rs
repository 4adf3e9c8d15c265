//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use ibom_core::config::AppConfig;
use ibom_service::{
    ArtifactGenerator, BoardParser, ExternalBoardParser, HtmlBomGenerator, PipelineService,
    SessionStore, WorkspaceManager,
};
use plugin_altium_converter::{AltiumConverter, ConversionMetrics, SourceConverter};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Artifact registry and active session
    pub sessions: Arc<SessionStore>,
    /// Workspace creation and upload storage
    pub workspaces: Arc<WorkspaceManager>,
    /// Upload pipeline
    pub pipeline: Arc<PipelineService>,
    /// Conversion counters reported by `/status`
    pub conversion_metrics: Arc<ConversionMetrics>,
    /// Port the listener is bound to; used when the `Host` header has none
    pub port: u16,
}

impl AppState {
    /// Wire the production collaborators from configuration.
    pub fn from_config(config: AppConfig, port: u16) -> Self {
        let converter = AltiumConverter::new(config.converter.clone());
        let metrics = converter.metrics();
        let parser = ExternalBoardParser::new(config.parser.clone());
        let generator = HtmlBomGenerator::new(config.generator.clone());

        Self::with_collaborators(
            config,
            Arc::new(converter),
            Arc::new(parser),
            Arc::new(generator),
            metrics,
            port,
        )
    }

    /// Wire explicit collaborators.
    pub fn with_collaborators(
        config: AppConfig,
        converter: Arc<dyn SourceConverter>,
        parser: Arc<dyn BoardParser>,
        generator: Arc<dyn ArtifactGenerator>,
        conversion_metrics: Arc<ConversionMetrics>,
        port: u16,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(&config.workspace));
        let workspaces = Arc::new(WorkspaceManager::new(config.workspace.clone()));
        let pipeline = Arc::new(PipelineService::new(
            converter,
            parser,
            generator,
            Arc::clone(&sessions),
        ));

        Self {
            config: Arc::new(config),
            sessions,
            workspaces,
            pipeline,
            conversion_metrics,
            port,
        }
    }
}
