//! Board file format classification.

use std::path::Path;

/// Human-readable list of accepted uploads.
pub const ACCEPTED_FORMATS: &str = ".PcbDoc (Altium Designer), .kicad_pcb (KiCad)";

/// A board format the pipeline knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardFormat {
    /// KiCad board, parsed directly.
    KicadPcb,
    /// Altium Designer board, converted to KiCad first.
    AltiumPcbDoc,
}

impl BoardFormat {
    /// Classify by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "kicad_pcb" => Some(Self::KicadPcb),
            "pcbdoc" => Some(Self::AltiumPcbDoc),
            _ => None,
        }
    }

    /// Whether the file must be converted before parsing.
    pub fn requires_conversion(self) -> bool {
        matches!(self, Self::AltiumPcbDoc)
    }

    /// Display name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::KicadPcb => "KiCad",
            Self::AltiumPcbDoc => "Altium Designer",
        }
    }
}

/// Lower-cased extension with its dot, or `"unknown"`.
pub fn describe_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_else(|| "unknown".to_string())
}
