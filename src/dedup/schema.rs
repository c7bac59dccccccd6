//! Database schema for the persistent seen store

/// SQL schema for the seen-key table
pub const SCHEMA_SQL: &str = r#"
-- Article keys already reported, one row per key
CREATE TABLE IF NOT EXISTS seen_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    source_id TEXT NOT NULL,
    seen_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_seen_keys_source ON seen_keys(source_id);
CREATE INDEX IF NOT EXISTS idx_seen_keys_seen_at ON seen_keys(seen_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
