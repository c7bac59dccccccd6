//! SQLite seen store
//!
//! Keys survive process restarts. Timestamps are stored as fixed-width UTC
//! RFC 3339 strings so they compare correctly as text.

use super::schema::initialize_schema;
use super::traits::{RetentionPolicy, SeenStore, StoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-backed seen store
pub struct SqliteSeenStore {
    conn: Connection,
    retention: RetentionPolicy,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SqliteSeenStore {
    /// Opens or creates a store at `path`
    pub fn new(path: &Path, retention: RetentionPolicy) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        tracing::debug!("Opened seen store at {}", path.display());
        Ok(Self { conn, retention })
    }

    /// Creates an in-memory database
    pub fn new_in_memory(retention: RetentionPolicy) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, retention })
    }

    /// When a key was first recorded
    pub fn seen_at(&self, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT seen_at FROM seen_keys WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| super::StoreError::Timestamp(s))
        })
        .transpose()
    }
}

impl SeenStore for SqliteSeenStore {
    fn contains(&self, key: &str) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_keys WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn commit(&mut self, entries: &[(String, String)], now: DateTime<Utc>) -> StoreResult<()> {
        let seen_at = timestamp(now);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO seen_keys (key, source_id, seen_at) VALUES (?1, ?2, ?3)",
            )?;
            for (key, source_id) in entries {
                stmt.execute(params![key, source_id, seen_at])?;
            }
        }

        if let Some(max) = self.retention.max_entries {
            let max = i64::try_from(max).unwrap_or(i64::MAX);
            tx.execute(
                "DELETE FROM seen_keys WHERE id NOT IN
                 (SELECT id FROM seen_keys ORDER BY id DESC LIMIT ?1)",
                params![max],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> StoreResult<usize> {
        let Some(cutoff) = self.retention.expiry_cutoff(now) else {
            return Ok(0);
        };
        let removed = self.conn.execute(
            "DELETE FROM seen_keys WHERE seen_at < ?1",
            params![timestamp(cutoff)],
        )?;
        Ok(removed)
    }

    fn forget_source(&mut self, source_id: &str) -> StoreResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM seen_keys WHERE source_id = ?1",
            params![source_id],
        )?;
        Ok(removed)
    }

    fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_keys", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.conn.execute("DELETE FROM seen_keys", [])?;
        Ok(())
    }
}
