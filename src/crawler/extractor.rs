//! HTML extractor for article-like links
//!
//! This module turns a fetched front page into [`Candidate`] records:
//! - Links to other pages of the same site (from `<a href>` tags)
//! - A title taken from the link's heading or text
//! - A snippet from the surrounding listing item
//! - An optional publication time from a `<time datetime>` element
//!
//! Extraction never fails. Markup that cannot be made sense of simply yields
//! [`ExtractionOutcome::Empty`].

use crate::article::Candidate;
use crate::registry::SiteConfig;
use crate::url::is_same_site;
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Links whose text has at least this many words count as article-like on their own
pub const MIN_TITLE_WORDS: usize = 3;

/// Snippets are cut to this many characters
pub const MAX_SNIPPET_CHARS: usize = 280;

/// Ancestor levels searched for a listing container around a link
const MAX_CONTAINER_DEPTH: usize = 6;

/// Class name fragments used by common news-listing markup
const LISTING_CLASS_HINTS: &[&str] = &[
    "post", "article", "story", "card", "teaser", "entry", "news", "headline",
];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4"];

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// At least one candidate was found; the page may still have been partly malformed
    Partial(Vec<Candidate>),
    /// Nothing article-like on the page
    Empty,
}

impl ExtractionOutcome {
    pub fn len(&self) -> usize {
        match self {
            Self::Partial(candidates) => candidates.len(),
            Self::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            Self::Partial(candidates) => candidates,
            Self::Empty => Vec::new(),
        }
    }
}

/// Extracts candidates from a page fetched from the site's root URL
pub fn extract(content: &[u8], site: &SiteConfig) -> ExtractionOutcome {
    extract_with_base(content, site, &site.root_url)
}

/// Extracts candidates, resolving relative links against `base_url`
///
/// `base_url` is the final URL after redirects. Links are kept when they point
/// to the same site as either the root URL or the base URL.
///
/// # Example
///
/// ```
/// use retailer_news::crawler::{extract, ExtractionOutcome};
/// use retailer_news::SiteConfig;
///
/// let site = SiteConfig::new("Example", "https://example.com/", ["retail"]).unwrap();
/// let html = br#"<article><h2><a href="/news/retail-sales-rise">Retail sales rise</a></h2></article>"#;
/// let outcome = extract(html, &site);
/// assert_eq!(outcome.len(), 1);
///
/// assert_eq!(extract(b"", &site), ExtractionOutcome::Empty);
/// ```
pub fn extract_with_base(content: &[u8], site: &SiteConfig, base_url: &Url) -> ExtractionOutcome {
    let text = String::from_utf8_lossy(content);
    if text.trim().is_empty() {
        return ExtractionOutcome::Empty;
    }

    let Some(selectors) = Selectors::new() else {
        return ExtractionOutcome::Empty;
    };

    let document = Html::parse_document(&text);
    let discovered_at = Utc::now();
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for anchor in document.select(&selectors.anchor) {
        if anchor.value().attr("download").is_some() {
            continue;
        }

        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if !is_same_site(&url, &site.root_url) && !is_same_site(&url, base_url) {
            continue;
        }

        if is_front_page(&url, &site.root_url) || is_front_page(&url, base_url) {
            continue;
        }

        if !site.in_scope(&url) {
            continue;
        }

        let title = anchor_title(&anchor, &selectors);
        if title.is_empty() {
            continue;
        }

        let container = listing_container(&anchor);
        if !looks_like_article(&anchor, container.is_some(), &title, &selectors) {
            continue;
        }

        if !seen.insert(url.as_str().to_string()) {
            continue;
        }

        let snippet = container
            .as_ref()
            .and_then(|c| first_paragraph(c, &title, &selectors))
            .unwrap_or_else(|| title.clone());
        let published_at = container
            .as_ref()
            .and_then(|c| published_time(c, &selectors));

        candidates.push(Candidate {
            source_id: site.id.clone(),
            url,
            title,
            snippet,
            discovered_at,
            published_at,
        });
    }

    tracing::debug!("Extracted {} candidate(s) for {}", candidates.len(), site.id);

    if candidates.is_empty() {
        ExtractionOutcome::Empty
    } else {
        ExtractionOutcome::Partial(candidates)
    }
}

struct Selectors {
    anchor: Selector,
    heading: Selector,
    paragraph: Selector,
    time: Selector,
}

impl Selectors {
    fn new() -> Option<Self> {
        Some(Self {
            anchor: Selector::parse("a[href]").ok()?,
            heading: Selector::parse("h1, h2, h3, h4").ok()?,
            paragraph: Selector::parse("p").ok()?,
            time: Selector::parse("time[datetime]").ok()?,
        })
    }
}

/// Resolves a link href to an absolute http(s) URL without fragment
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// True when `url` is the listing page itself rather than a distinct page
pub(crate) fn is_front_page(url: &Url, root: &Url) -> bool {
    url.query().is_none()
        && is_same_site(url, root)
        && url.path().trim_end_matches('/') == root.path().trim_end_matches('/')
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Title: heading inside the link, else the link text, else its title attribute
fn anchor_title(anchor: &ElementRef, selectors: &Selectors) -> String {
    if let Some(heading) = anchor.select(&selectors.heading).next() {
        let text = element_text(&heading);
        if !text.is_empty() {
            return text;
        }
    }

    let text = element_text(anchor);
    if !text.is_empty() {
        return text;
    }

    anchor
        .value()
        .attr("title")
        .map(collapse_whitespace)
        .unwrap_or_default()
}

fn in_heading(anchor: &ElementRef) -> bool {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_CONTAINER_DEPTH)
        .any(|el| HEADING_TAGS.contains(&el.value().name()))
}

fn has_listing_class(element: &ElementRef) -> bool {
    element.value().classes().any(|class| {
        let class = class.to_ascii_lowercase();
        LISTING_CLASS_HINTS.iter().any(|hint| class.contains(hint))
    })
}

/// Nearest `<article>` or listing-classed ancestor of a link
fn listing_container<'a>(anchor: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_CONTAINER_DEPTH)
        .take_while(|el| !matches!(el.value().name(), "body" | "html" | "main"))
        .find(|el| el.value().name() == "article" || has_listing_class(el))
}

fn looks_like_article(
    anchor: &ElementRef,
    in_container: bool,
    title: &str,
    selectors: &Selectors,
) -> bool {
    in_container
        || in_heading(anchor)
        || anchor.select(&selectors.heading).next().is_some()
        || title.split_whitespace().count() >= MIN_TITLE_WORDS
}

/// First non-empty paragraph of the container that is not just the title
fn first_paragraph(container: &ElementRef, title: &str, selectors: &Selectors) -> Option<String> {
    container
        .select(&selectors.paragraph)
        .map(|p| element_text(&p))
        .find(|text| !text.is_empty() && text != title)
        .map(|text| truncate_chars(&text, MAX_SNIPPET_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn published_time(container: &ElementRef, selectors: &Selectors) -> Option<DateTime<Utc>> {
    container
        .select(&selectors.time)
        .filter_map(|el| el.value().attr("datetime"))
        .find_map(parse_datetime)
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
