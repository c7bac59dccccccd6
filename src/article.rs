//! Article records produced by a crawl

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use url::Url;

/// A raw article-like link found on a site's page, before relevance filtering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Id of the site the candidate was found on
    pub source_id: String,

    /// Absolute article URL, fragment removed
    pub url: Url,

    pub title: String,

    /// Short teaser text; falls back to the title
    pub snippet: String,

    /// When the extractor saw the link
    pub discovered_at: DateTime<Utc>,

    /// Publication time when the page exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// A candidate that passed relevance filtering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    #[serde(flatten)]
    pub candidate: Candidate,

    /// Fraction of the site's topics matched, in `[0, 1]`
    pub relevance_score: f64,

    pub matched_topics: BTreeSet<String>,
}

impl Article {
    pub fn url(&self) -> &Url {
        &self.candidate.url
    }

    pub fn title(&self) -> &str {
        &self.candidate.title
    }
}
