//! Topic relevance scoring
//!
//! A candidate's title and snippet are tokenized and compared against the
//! site's topics. Multi-word topics match as consecutive token phrases.

use crate::article::{Article, Candidate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// A word, optionally joined to the next by a hyphen or apostrophe
static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\w+(?:['\u{2019}-]\w+)*").expect("word regex"));

/// Splits text into lowercase word tokens
///
/// Hyphens and apostrophes inside a word are dropped so "e-commerce" and
/// "ecommerce" produce the same token. Everything else that is not a word
/// character separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|word| {
            let joined: String = word
                .as_str()
                .chars()
                .filter(|c| !matches!(c, '-' | '\'' | '\u{2019}'))
                .flat_map(char::to_lowercase)
                .collect();
            normalize_token(joined)
        })
        .collect()
}

/// Folds simple plurals so "stores" matches the topic "store"
fn normalize_token(token: String) -> String {
    if token.chars().count() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        let mut token = token;
        token.pop();
        token
    } else {
        token
    }
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && haystack.windows(phrase.len()).any(|window| window == phrase)
}

/// Topics of `topics` that occur in the candidate's title or snippet
///
/// Title and snippet are matched separately, so a phrase never spans the two.
pub fn matched_topics(candidate: &Candidate, topics: &BTreeSet<String>) -> BTreeSet<String> {
    let fields = [tokenize(&candidate.title), tokenize(&candidate.snippet)];

    topics
        .iter()
        .filter(|topic| {
            let phrase = tokenize(topic);
            fields.iter().any(|field| contains_phrase(field, &phrase))
        })
        .cloned()
        .collect()
}

/// Scores a candidate: the fraction of topics it matches
///
/// Returns `None` when no topic matches. An empty topic set accepts every
/// candidate with score 1.0.
pub fn score(candidate: &Candidate, topics: &BTreeSet<String>) -> Option<(f64, BTreeSet<String>)> {
    if topics.is_empty() {
        return Some((1.0, BTreeSet::new()));
    }

    let matched = matched_topics(candidate, topics);
    if matched.is_empty() {
        return None;
    }

    let score = matched.len() as f64 / topics.len() as f64;
    Some((score, matched))
}

/// Keeps candidates scoring at least `threshold`, best first
///
/// Candidates with equal scores stay in page order.
///
/// ```
/// use retailer_news::crawler::relevance::filter;
/// use retailer_news::Candidate;
/// use std::collections::BTreeSet;
///
/// let candidate = Candidate {
///     source_id: "x.com".to_string(),
///     url: url::Url::parse("https://x.com/a").unwrap(),
///     title: "Ecommerce growth slows".to_string(),
///     snippet: "Ecommerce growth slows".to_string(),
///     discovered_at: chrono::Utc::now(),
///     published_at: None,
/// };
/// let topics: BTreeSet<String> = ["ecommerce".to_string(), "checkout".to_string()].into();
///
/// let kept = filter(vec![candidate], &topics, 0.5);
/// assert_eq!(kept.len(), 1);
/// assert_eq!(kept[0].relevance_score, 0.5);
/// ```
pub fn filter(candidates: Vec<Candidate>, topics: &BTreeSet<String>, threshold: f64) -> Vec<Article> {
    let total = candidates.len();

    let mut articles: Vec<Article> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let (relevance_score, matched_topics) = score(&candidate, topics)?;
            (relevance_score >= threshold).then_some(Article {
                candidate,
                relevance_score,
                matched_topics,
            })
        })
        .collect();

    articles.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    tracing::debug!("{} of {} candidate(s) relevant", articles.len(), total);
    articles
}
