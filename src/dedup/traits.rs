//! Seen-store trait and error types
//!
//! A seen store remembers which article keys have already been reported so
//! later runs can suppress them. Two backends exist: an in-memory map and a
//! SQLite file that survives restarts.

use crate::config::DedupConfig;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors that can occur in a seen store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seen store lock poisoned")]
    LockPoisoned,

    #[error("Corrupt timestamp in seen store: {0}")]
    Timestamp(String),
}

/// Result type for seen-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// How long and how many keys a store remembers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Oldest keys are evicted past this count
    pub max_entries: Option<usize>,

    /// Keys older than this are purged before each dedupe
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Cut-off instant for `now`; keys seen before it are expired
    ///
    /// A window reaching past the earliest representable instant never expires
    /// anything.
    pub fn expiry_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.max_age.and_then(|age| now.checked_sub_signed(age))
    }
}

impl From<&DedupConfig> for RetentionPolicy {
    fn from(config: &DedupConfig) -> Self {
        let max_age = i64::try_from(config.max_age_hours)
            .ok()
            .filter(|hours| *hours > 0)
            .and_then(Duration::try_hours);

        Self {
            max_entries: (config.max_entries > 0).then_some(config.max_entries),
            max_age,
        }
    }
}

/// Storage backend for seen article keys
///
/// Implementations are driven from a single [`super::Deduplicator`] behind a
/// mutex, so methods take `&mut self` where they write.
pub trait SeenStore: Send {
    /// Returns true if the key was recorded by an earlier commit
    fn contains(&self, key: &str) -> StoreResult<bool>;

    /// Records keys as seen at `now`
    ///
    /// Each entry is `(key, source_id)`. Keys already present keep their
    /// original timestamp. Retention by count is applied after insertion.
    fn commit(&mut self, entries: &[(String, String)], now: DateTime<Utc>) -> StoreResult<()>;

    /// Drops keys older than the retention window; returns how many
    fn purge_expired(&mut self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Drops every key recorded for a source; returns how many
    fn forget_source(&mut self, source_id: &str) -> StoreResult<usize>;

    /// Number of remembered keys
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Forgets everything
    fn clear(&mut self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_from_config_zero_is_unbounded() {
        let policy = RetentionPolicy::from(&DedupConfig {
            max_entries: 0,
            max_age_hours: 0,
            database_path: None,
        });
        assert_eq!(policy, RetentionPolicy::unbounded());
        assert!(policy.expiry_cutoff(Utc::now()).is_none());
    }

    #[test]
    fn test_retention_from_config() {
        let policy = RetentionPolicy::from(&DedupConfig {
            max_entries: 10,
            max_age_hours: 2,
            database_path: None,
        });
        assert_eq!(policy.max_entries, Some(10));

        let now = Utc::now();
        assert_eq!(policy.expiry_cutoff(now), Some(now - Duration::hours(2)));
    }

    #[test]
    fn test_huge_max_age_never_expires() {
        let policy = RetentionPolicy::from(&DedupConfig {
            max_entries: 0,
            max_age_hours: 3_000_000_000,
            database_path: None,
        });
        assert!(policy.max_age.is_some());
        assert!(policy.expiry_cutoff(Utc::now()).is_none());
    }
}
