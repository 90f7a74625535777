//! Loading documents from disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::app::parse::parse;
use crate::domain::model::Document;

/// Read and parse the document at `path`.
pub fn load_document(path: &Path) -> Result<Document> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = parse(&source);
    for diagnostic in document.diagnostics() {
        let (line, column) = document.line_col(diagnostic.range.start);
        tracing::warn!(
            path = %path.display(),
            line = line + 1,
            column = column + 1,
            "{}",
            diagnostic.message
        );
    }
    Ok(document)
}

/// Resolve the document to open: a directory means the `file_name` inside it.
pub fn document_path(input: &Path, file_name: &str) -> PathBuf {
    if input.is_dir() {
        input.join(file_name)
    } else {
        input.to_path_buf()
    }
}
