//! Document ingestion: loads raw text from a local directory. Failures are
//! reported per file and skipped; a bad document never aborts the batch.

pub mod cleaner;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::Result;

/// A loaded source document. `text` may embed `\f` page-break markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub filename: String,
    pub text: String,
}

pub struct DocumentLoader {
    docs_path: PathBuf,
}

impl DocumentLoader {
    #[inline]
    pub fn new<P: AsRef<Path>>(docs_path: P) -> Self {
        Self {
            docs_path: docs_path.as_ref().to_path_buf(),
        }
    }

    /// Load every supported file in the directory, sorted by filename.
    /// Unsupported or unreadable files are logged and skipped.
    #[inline]
    pub fn load_documents(&self) -> Result<Vec<LoadedDocument>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.docs_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        entries.sort();

        let mut documents = Vec::new();
        for path in entries {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match load_file(&path) {
                Ok(Some(text)) => documents.push(LoadedDocument { filename, text }),
                Ok(None) => warn!("Unsupported file format: {}", path.display()),
                Err(e) => warn!("Error loading {}: {}", filename, e),
            }
        }

        info!("Loaded {} documents from {}", documents.len(), self.docs_path.display());
        Ok(documents)
    }
}

/// Returns `Ok(None)` for unsupported extensions.
fn load_file(path: &Path) -> Result<Option<String>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "txt" | "md" => fs::read_to_string(path)?,
        "json" => {
            let raw = fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&raw)
                .map_err(|e| crate::RagError::Ingestion(format!("invalid JSON: {}", e)))?;
            extract_from_json(&value)
        }
        "html" | "htm" => extract_from_html(&fs::read_to_string(path)?),
        _ => return Ok(None),
    };
    Ok(Some(text))
}

/// Flatten arbitrary JSON into `key : value` text.
fn extract_from_json(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{} : {}", k, extract_from_json(v)))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Array(items) => items
            .iter()
            .map(extract_from_json)
            .collect::<Vec<_>>()
            .join(" "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip markup, keeping the text content line-separated.
fn extract_from_html(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
