//! Sitemap reader
//!
//! A site can name a `sitemap.xml` next to its front page. Every `<url>` entry
//! that points back into the site becomes a [`Candidate`]. Sitemaps carry no
//! headline, so the title is rebuilt from the URL slug and doubles as the
//! snippet.

use crate::article::Candidate;
use crate::crawler::extractor::{is_front_page, parse_datetime};
use crate::registry::SiteConfig;
use crate::url::is_same_site;
use chrono::Utc;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

/// Entries read from one sitemap at most
pub const MAX_SITEMAP_ENTRIES: usize = 1_000;

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    loc: String,
    #[serde(default)]
    lastmod: Option<String>,
}

/// Turns a sitemap document into candidates for `site`
///
/// Unparseable documents, off-site links, out-of-scope paths and URLs without
/// a readable slug are skipped. A sitemap index lists no `<url>` entries and
/// yields nothing.
///
/// ```
/// use retailer_news::crawler::parse_sitemap;
/// use retailer_news::SiteConfig;
///
/// let site = SiteConfig::new("Example", "https://example.com/", ["retail"]).unwrap();
/// let xml = br#"<urlset><url><loc>https://example.com/news/retail-sales-rise</loc></url></urlset>"#;
/// let found = parse_sitemap(xml, &site);
/// assert_eq!(found[0].title, "Retail sales rise");
/// ```
pub fn parse_sitemap(content: &[u8], site: &SiteConfig) -> Vec<Candidate> {
    let text = String::from_utf8_lossy(content);

    let set: UrlSet = match from_str(&text) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!("{}: unreadable sitemap: {}", site.id, e);
            return Vec::new();
        }
    };

    let discovered_at = Utc::now();
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for entry in set.urls.into_iter().take(MAX_SITEMAP_ENTRIES) {
        let Ok(mut url) = Url::parse(entry.loc.trim()) else {
            continue;
        };
        url.set_fragment(None);

        if !is_same_site(&url, &site.root_url)
            || is_front_page(&url, &site.root_url)
            || !site.in_scope(&url)
        {
            continue;
        }

        let Some(title) = title_from_slug(&url) else {
            continue;
        };

        if !seen.insert(url.as_str().to_string()) {
            continue;
        }

        candidates.push(Candidate {
            source_id: site.id.clone(),
            url,
            snippet: title.clone(),
            title,
            discovered_at,
            published_at: entry.lastmod.as_deref().and_then(parse_datetime),
        });
    }

    tracing::debug!("Read {} sitemap candidate(s) for {}", candidates.len(), site.id);
    candidates
}

/// "/news/2025/grocer-opens-store.html" becomes "Grocer opens store"
fn title_from_slug(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let stem = segment.rsplit_once('.').map_or(segment, |(stem, _)| stem);

    let words: Vec<&str> = stem
        .split(|c: char| c == '-' || c == '_' || c == '+')
        .filter(|w| !w.is_empty() && !w.chars().all(|c| c.is_ascii_digit()))
        .collect();

    let (first, rest) = words.split_first()?;
    let mut title: String = first
        .chars()
        .take(1)
        .flat_map(char::to_uppercase)
        .chain(first.chars().skip(1))
        .collect();
    for word in rest {
        title.push(' ');
        title.push_str(word);
    }
    Some(title)
}
