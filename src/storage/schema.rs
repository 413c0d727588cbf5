//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the site repository.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per site, keyed by domain
CREATE TABLE IF NOT EXISTS site_info (
    domain TEXT PRIMARY KEY,
    progress INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    status_description TEXT,
    status_time INTEGER NOT NULL,
    page_count INTEGER NOT NULL DEFAULT 0,
    link_count INTEGER NOT NULL DEFAULT 0,
    refresh_enabled INTEGER NOT NULL DEFAULT 1
);

-- Pages of the current snapshot of each site
CREATE TABLE IF NOT EXISTS site_pages (
    domain TEXT NOT NULL,
    page_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    distance_from_root INTEGER NOT NULL,
    http_status INTEGER,
    status TEXT NOT NULL,
    PRIMARY KEY (domain, page_id)
);

-- Links between pages of the same snapshot
CREATE TABLE IF NOT EXISTS site_links (
    domain TEXT NOT NULL,
    from_page_id INTEGER NOT NULL,
    to_page_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (domain, from_page_id, to_page_id)
);

-- Processing queue; a message is leased by `get` and removed by `ack`
CREATE TABLE IF NOT EXISTS site_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    visible_at INTEGER NOT NULL,
    ack TEXT,
    tries INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_site_queue_visible ON site_queue(deleted, visible_at);
CREATE INDEX IF NOT EXISTS idx_site_queue_ack ON site_queue(ack);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
