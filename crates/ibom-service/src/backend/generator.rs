//! Self-contained HTML bill of materials.
//!
//! Components are grouped by value and footprint. The full board data,
//! including the computed BOM, is embedded as JSON so the page's scripts can
//! draw the board without further requests.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use ibom_core::config::GeneratorConfig;
use serde::Serialize;
use tracing::{info, instrument};

use super::{ArtifactGenerator, BackendError, Component, ParsedBoard};

/// Placement attribute of components that are never populated.
const VIRTUAL_ATTR: &str = "Virtual";

/// One BOM line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomGroup {
    /// Shared value.
    pub value: String,
    /// Shared footprint.
    pub footprint: String,
    /// Reference designators, naturally sorted.
    pub refs: Vec<String>,
    /// Number of placements.
    pub quantity: usize,
}

/// Grouped BOM for both sides and each side separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bom {
    /// All populated components.
    pub both: Vec<BomGroup>,
    /// Front side only.
    #[serde(rename = "F")]
    pub front: Vec<BomGroup>,
    /// Back side only.
    #[serde(rename = "B")]
    pub back: Vec<BomGroup>,
    /// References left out of the BOM.
    pub skipped: Vec<String>,
}

/// Group components into BOM lines.
pub fn build_bom(components: &[Component]) -> Bom {
    let (populated, skipped): (Vec<&Component>, Vec<&Component>) = components
        .iter()
        .partition(|c| !c.attr.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(VIRTUAL_ATTR)));

    let mut skipped: Vec<String> = skipped.iter().map(|c| c.reference.clone()).collect();
    skipped.sort_by(|a, b| natural_cmp(a, b));

    Bom {
        both: group(populated.iter().copied()),
        front: group(populated.iter().copied().filter(|c| c.layer == "F")),
        back: group(populated.iter().copied().filter(|c| c.layer == "B")),
        skipped,
    }
}

fn group<'a>(components: impl Iterator<Item = &'a Component>) -> Vec<BomGroup> {
    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for c in components {
        groups
            .entry((c.val.clone(), c.footprint.clone()))
            .or_default()
            .push(c.reference.clone());
    }

    let mut out: Vec<BomGroup> = groups
        .into_iter()
        .map(|((value, footprint), mut refs)| {
            refs.sort_by(|a, b| natural_cmp(a, b));
            BomGroup {
                value,
                footprint,
                quantity: refs.len(),
                refs,
            }
        })
        .collect();
    // Lines ordered by their first reference.
    out.sort_by(|a, b| match (a.refs.first(), b.refs.first()) {
        (Some(x), Some(y)) => natural_cmp(x, y),
        _ => Ordering::Equal,
    });
    out
}

/// Compare references so that `R2` sorts before `R10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn split(s: &str) -> (&str, Option<u64>, &str) {
        let start = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let rest = &s[start..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        (&s[..start], rest[..end].parse().ok(), &rest[end..])
    }
    let (pa, na, sa) = split(a);
    let (pb, nb, sb) = split(b);
    pa.cmp(pb).then(na.cmp(&nb)).then(sa.cmp(sb))
}

/// HTML BOM renderer.
#[derive(Debug, Clone)]
pub struct HtmlBomGenerator {
    config: GeneratorConfig,
}

impl HtmlBomGenerator {
    /// Create a generator.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    fn render(&self, title: &str, bom: &Bom, data_json: &str) -> String {
        let mut rows = String::new();
        for (i, line) in bom.both.iter().enumerate() {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                i + 1,
                escape_html(&line.refs.join(", ")),
                escape_html(&line.value),
                escape_html(&line.footprint),
                line.quantity,
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 1.5em; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ccc; padding: 4px 8px; text-align: left; }}
th {{ background: #f0f0f0; }}
tr:nth-child(even) {{ background: #fafafa; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>Generated {generated}</p>
<table id="bom">
<thead><tr><th>#</th><th>References</th><th>Value</th><th>Footprint</th><th>Qty</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
<script id="pcbdata" type="application/json">{data_json}</script>
<script>
var pcbdata = JSON.parse(document.getElementById("pcbdata").textContent);
</script>
</body>
</html>
"#,
            title = escape_html(title),
            generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

#[async_trait]
impl ArtifactGenerator for HtmlBomGenerator {
    #[instrument(skip_all, fields(source = %source.display()))]
    async fn generate(
        &self,
        board: ParsedBoard,
        source: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, BackendError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| BackendError::Generation(format!("No file name in {}", source.display())))?;

        let bom = build_bom(&board.components);
        let mut data = board.board_data;
        let map = data
            .as_object_mut()
            .ok_or_else(|| BackendError::Generation("Board data is not a JSON object".into()))?;
        map.insert("bom".to_string(), serde_json::to_value(&bom)?);
        map.insert(
            "ibom_version".to_string(),
            serde_json::Value::String(self.config.version.clone()),
        );

        let data_json = serde_json::to_string(&data)?.replace("</", "<\\/");
        let title = format!("{} - {stem}", self.config.title);
        let html = self.render(&title, &bom, &data_json);

        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(self.config.artifact_name(&stem));
        tokio::fs::write(&path, html).await?;

        info!(artifact = %path.display(), lines = bom.both.len(), "Generated BOM");
        Ok(path)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
