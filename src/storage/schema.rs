//! Database schema for the block ledger

/// SQL schema for the ledger database
pub const SCHEMA_SQL: &str = r#"
-- One row per processed block
CREATE TABLE IF NOT EXISTS blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    mode TEXT NOT NULL,
    candidates INTEGER NOT NULL,
    registered INTEGER NOT NULL,
    resolver_errors INTEGER NOT NULL,
    upload_status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_blocks_finished_at ON blocks(finished_at);

-- Lifetime per-TLD counters
CREATE TABLE IF NOT EXISTS tld_totals (
    tld TEXT PRIMARY KEY,
    domains_checked_total INTEGER NOT NULL DEFAULT 0,
    short_domains_checked_total INTEGER NOT NULL DEFAULT 0,
    short_unregistered_count INTEGER NOT NULL DEFAULT 0,
    short_no_website_count INTEGER NOT NULL DEFAULT 0,
    short_active_site_count INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Payloads whose upload has not yet succeeded
CREATE TABLE IF NOT EXISTS outbox (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    payload TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 1,
    last_error TEXT
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
