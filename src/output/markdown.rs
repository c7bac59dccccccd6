//! Markdown digest generation
//!
//! This module renders a crawl report as a human-readable digest: a summary
//! table, the new articles grouped by site, and the sites that failed.

use super::{ensure_parent_dir, OutputResult};
use crate::report::{CrawlReport, SiteOutcome};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown digest of a report to `output_path`
pub fn write_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    ensure_parent_dir(output_path)?;
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::debug!("Wrote markdown digest to {}", output_path.display());
    Ok(())
}

/// Escapes characters that would break a markdown link label or table cell
fn escape(text: &str) -> String {
    text.replace('|', "\\|")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let stats = report.stats();
    let mut md = String::new();

    md.push_str("# Retail News Digest\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n\n",
        report.duration().num_milliseconds() as f64 / 1000.0
    ));

    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Sites crawled | {} |\n", stats.sites_total));
    md.push_str(&format!("| Sites ok | {} |\n", stats.sites_ok));
    md.push_str(&format!("| Sites failed | {} |\n", stats.sites_failed));
    md.push_str(&format!("| New articles | {} |\n\n", stats.new_articles));

    if stats.new_articles > 0 {
        md.push_str("## New Articles\n\n");

        for (site_id, outcome) in &report.per_site {
            let Some(articles) = outcome.articles().filter(|a| !a.is_empty()) else {
                continue;
            };

            md.push_str(&format!("### {}\n\n", site_id));
            for article in articles {
                md.push_str(&format!(
                    "- [{}]({}) ({:.0}%)",
                    escape(article.title()),
                    article.url(),
                    article.relevance_score * 100.0
                ));
                if let Some(published) = article.candidate.published_at {
                    md.push_str(&format!(" {}", published.format("%Y-%m-%d")));
                }
                md.push('\n');

                if article.candidate.snippet != article.candidate.title {
                    md.push_str(&format!("  > {}\n", escape(&article.candidate.snippet)));
                }
            }
            md.push('\n');
        }
    } else {
        md.push_str("No new articles.\n\n");
    }

    if stats.sites_failed > 0 {
        md.push_str("## Failed Sites\n\n");
        md.push_str("| Site | Error |\n");
        md.push_str("|------|-------|\n");

        for (site_id, outcome) in &report.per_site {
            if let SiteOutcome::Failed(err) = outcome {
                md.push_str(&format!("| {} | {} |\n", site_id, escape(&err.to_string())));
            }
        }
        md.push('\n');
    }

    md
}
