//! JSON report export

use super::{ensure_parent_dir, OutputResult};
use crate::report::CrawlReport;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serializes a report as pretty-printed JSON
pub fn to_json_string(report: &CrawlReport) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Writes a report as pretty-printed JSON to `path`
pub fn write_json(report: &CrawlReport, path: &Path) -> OutputResult<()> {
    ensure_parent_dir(path)?;

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::debug!("Wrote JSON report to {}", path.display());
    Ok(())
}
