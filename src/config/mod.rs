//! Configuration loading and validation
//!
//! The configuration is a TOML file with `[crawler]`, `[user-agent]` and `[dedup]`
//! sections plus one `[[site]]` table per news source.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use types::{Config, CrawlerConfig, DedupConfig, SiteEntry, UserAgentConfig};
pub use validation::{validate, validate_site_entry, validate_sitemap_url};
