//! # ibom-service
//!
//! Upload processing for the iBoM web service: per-upload workspaces, the
//! convert/parse/generate pipeline, and the registry that maps generated
//! artifacts back to files on disk.
//!
//! Services follow constructor injection. Collaborators are provided at
//! construction time as `Arc<dyn Trait>` so tests can swap in fakes.

pub mod backend;
pub mod format;
pub mod pipeline;
pub mod registry;
pub mod workspace;

pub use backend::{
    ArtifactGenerator, BackendError, BoardParser, Component, ExternalBoardParser,
    HtmlBomGenerator, ParsedBoard,
};
pub use format::BoardFormat;
pub use pipeline::{FailureKind, PipelineError, PipelineOutcome, PipelineService};
pub use registry::SessionStore;
pub use workspace::{Workspace, WorkspaceManager, sanitize_filename};
