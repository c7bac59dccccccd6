//! Output module for writing crawl reports
//!
//! This module handles:
//! - Serializing a [`CrawlReport`](crate::CrawlReport) as JSON
//! - Generating a human-readable markdown digest of new articles

mod json;
mod markdown;

pub use json::{to_json_string, write_json};
pub use markdown::{format_markdown_report, write_markdown_report};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Creates the parent directory of an output file if needed
pub(crate) fn ensure_parent_dir(path: &std::path::Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            OutputError::Write(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }
    Ok(())
}
