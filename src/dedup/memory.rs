//! In-memory seen store

use super::traits::{RetentionPolicy, SeenStore, StoreResult};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
struct SeenEntry {
    source_id: String,
    seen_at: DateTime<Utc>,
}

/// Seen store that lives for the lifetime of the process
///
/// Insertion order is tracked so the oldest keys are evicted first when the
/// entry limit is reached.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    entries: HashMap<String, SeenEntry>,
    order: VecDeque<String>,
    retention: RetentionPolicy,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&SeenEntry) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !predicate(entry));
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
        before - self.entries.len()
    }

    fn evict_overflow(&mut self) {
        let Some(max) = self.retention.max_entries else {
            return;
        };

        while self.entries.len() > max {
            match self.order.pop_front() {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl SeenStore for MemorySeenStore {
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn commit(&mut self, entries: &[(String, String)], now: DateTime<Utc>) -> StoreResult<()> {
        for (key, source_id) in entries {
            if self.entries.contains_key(key) {
                continue;
            }
            self.entries.insert(
                key.clone(),
                SeenEntry {
                    source_id: source_id.clone(),
                    seen_at: now,
                },
            );
            self.order.push_back(key.clone());
        }

        self.evict_overflow();
        Ok(())
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> StoreResult<usize> {
        let Some(cutoff) = self.retention.expiry_cutoff(now) else {
            return Ok(0);
        };
        Ok(self.remove_where(|entry| entry.seen_at < cutoff))
    }

    fn forget_source(&mut self, source_id: &str) -> StoreResult<usize> {
        Ok(self.remove_where(|entry| entry.source_id == source_id))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.len())
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.entries.clear();
        self.order.clear();
        Ok(())
    }
}
