//! # Altium converter
//!
//! Converts Altium Designer `.PcbDoc` boards into KiCad `.kicad_pcb` files
//! with the external altium2kicad Perl toolchain.
//!
//! The toolchain is searched on every attempt (bundled copy, `PATH`,
//! conventional locations, then around the source file) and run in a
//! throwaway scratch directory with hard per-step timeouts. Converted boards
//! are written next to their source and reused while they are fresh.

pub mod cache;
pub mod converter;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod metrics;

pub use cache::ConversionCache;
pub use converter::{AltiumConverter, ConvertedBoard, SourceConverter};
pub use discovery::{DiscoveryMethod, Toolchain, ToolchainLocator};
pub use error::{ConversionError, FailureClass};
pub use executor::{ExecutionParams, ExecutorError, ProcessRunner};
pub use metrics::{ConversionMetrics, MetricsSnapshot};
