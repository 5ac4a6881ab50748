//! Output formatting for CLI commands.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SemsearchArgs};
use crate::error::Result;
use crate::service::{SearchResult, ServiceStats};

/// Result structure for document addition.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentAdditionResult {
    pub files: usize,
    pub documents_added: usize,
    pub total_documents: usize,
    pub store_path: PathBuf,
    pub duration_ms: u64,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchResult>,
    pub web_content: Option<String>,
    pub duration_ms: u64,
}

/// Index statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(flatten)]
    pub service: ServiceStats,
    pub store_path: PathBuf,
    pub file_size_bytes: u64,
}

/// Rendered retrieval context, printed verbatim in human mode.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenderedContext {
    pub query: String,
    pub context: String,
}

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn render_human(&self) -> String;
}

impl HumanOutput for DocumentAdditionResult {
    fn render_human(&self) -> String {
        format!(
            "Added {} documents from {} files ({} total) in {}ms\nSnapshot: {}",
            self.documents_added,
            self.files,
            self.total_documents,
            self.duration_ms,
            self.store_path.display()
        )
    }
}

impl HumanOutput for SearchResults {
    fn render_human(&self) -> String {
        let mut lines = vec!["Search Results:".to_string(), "═══════════════".to_string()];
        for (i, hit) in self.hits.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!(
                "Result {}: (Score: {:.3}, Slot: {})",
                i + 1,
                hit.score,
                hit.slot
            ));
            lines.push("─────────────".to_string());
            lines.push(hit.text.clone());
        }
        if let Some(web) = &self.web_content {
            lines.push(String::new());
            lines.push("Web Search:".to_string());
            lines.push("───────────".to_string());
            lines.push(web.clone());
        }
        lines.push(String::new());
        lines.push(format!("Total hits: {}", self.hits.len()));
        lines.push(format!("Search time: {}ms", self.duration_ms));
        lines.join("\n")
    }
}

impl HumanOutput for IndexStats {
    fn render_human(&self) -> String {
        [
            "Index Statistics:".to_string(),
            "════════════════".to_string(),
            format!("Total documents: {}", self.service.document_count),
            format!("Dimension: {}", self.service.dimension),
            format!("Index kind: {}", self.service.index_kind.name()),
            format!("Embedder: {}", self.service.embedder),
            format!("Snapshot: {}", self.store_path.display()),
            format!("Snapshot size: {}", format_bytes(self.file_size_bytes)),
        ]
        .join("\n")
    }
}

impl HumanOutput for RenderedContext {
    fn render_human(&self) -> String {
        self.context.clone()
    }
}

/// Format a result in the requested output format.
pub fn format_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &SemsearchArgs,
) -> Result<String> {
    Ok(match args.output_format {
        OutputFormat::Human if args.verbosity() > 1 => {
            format!("{message}\n\n{}", result.render_human())
        }
        OutputFormat::Human => result.render_human(),
        OutputFormat::Json if args.pretty => serde_json::to_string_pretty(result)?,
        OutputFormat::Json => serde_json::to_string(result)?,
    })
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &SemsearchArgs,
) -> Result<()> {
    println!("{}", format_result(message, result, args)?);
    Ok(())
}

/// Format bytes in human-readable format.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
