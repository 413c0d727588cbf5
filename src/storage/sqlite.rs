//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SiteRepository trait.
//! The connection sits behind a mutex; every operation is one short transaction.

use crate::domain::is_valid_domain;
use crate::site::{Page, Site, SiteContents, SiteInfo};
use crate::state::{PageStatus, SiteStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SiteRepository, StorageError, StorageResult};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// How long a leased queue message stays invisible to other consumers
const LEASE_MILLIS: i64 = 30_000;

/// Enqueues between two queue compactions, unless configured otherwise
const DEFAULT_QUEUE_CLEAN_INTERVAL: u64 = 1000;

/// A leased queue message
#[derive(Debug, Clone)]
struct QueueMessage {
    id: i64,
    ack: String,
    payload: String,
}

/// SQLite site repository
pub struct SqliteSiteRepository {
    conn: Mutex<Option<Connection>>,
    queue_adds: AtomicU64,
    queue_clean_interval: u64,
}

impl SqliteSiteRepository {
    /// Opens or creates the database at `path`
    ///
    /// Acknowledged queue messages left by a previous process are purged.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::from_connection(conn)
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        initialize_schema(&conn)?;
        let removed = clean_messages(&conn)?;
        if removed > 0 {
            debug!(removed, "purged acknowledged queue messages");
        }

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            queue_adds: AtomicU64::new(0),
            queue_clean_interval: DEFAULT_QUEUE_CLEAN_INTERVAL,
        })
    }

    /// Sets how many enqueues trigger a queue compaction
    pub fn with_queue_clean_interval(mut self, interval: u64) -> Self {
        self.queue_clean_interval = interval.max(1);
        self
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let conn = guard.as_mut().ok_or(StorageError::Closed)?;
        f(conn)
    }
}

fn check_domain(domain: &str) -> StorageResult<()> {
    if is_valid_domain(domain) {
        Ok(())
    } else {
        Err(StorageError::InvalidDomain(domain.to_string()))
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_time(millis: i64) -> StorageResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::Corrupt(format!("status_time {}", millis)))
}

impl SiteRepository for SqliteSiteRepository {
    fn save_site(&self, site: &Site, overwrite: bool, update_only: bool) -> StorageResult<Site> {
        let domain = site.info.domain.as_str();
        check_domain(domain)?;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let previous: Option<i64> = tx
                .query_row(
                    "SELECT status_time FROM site_info WHERE domain = ?1",
                    params![domain],
                    |row| row.get(0),
                )
                .optional()?;

            match previous {
                Some(_) if !overwrite => {
                    return Err(StorageError::AlreadyExists(domain.to_string()))
                }
                None if update_only => return Err(StorageError::NotFound(domain.to_string())),
                _ => {}
            }

            let mut status_millis = site.info.status_time.timestamp_millis();
            if let Some(previous) = previous {
                if status_millis <= previous {
                    status_millis = previous + 1;
                }
            }

            let mut stored = site.clone();
            stored.info.status_time = millis_to_time(status_millis)?;
            write_info(&tx, &stored.info)?;

            if let Some(contents) = &site.contents {
                write_contents(&tx, domain, contents)?;
            }

            tx.commit()?;
            Ok(stored)
        })
    }

    fn get_site(
        &self,
        domain: &str,
        include_contents: bool,
        cached_timestamp: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<Site>> {
        check_domain(domain)?;

        self.with_conn(|conn| {
            let Some(info) = read_info(conn, domain)? else {
                return Ok(None);
            };

            let cache_is_current = cached_timestamp
                .map(|t| t.timestamp_millis() == info.status_time.timestamp_millis())
                .unwrap_or(false);

            let contents = if include_contents && !cache_is_current {
                Some(read_contents(conn, domain)?)
            } else {
                None
            };

            Ok(Some(Site { info, contents }))
        })
    }

    fn remove_site(&self, domain: &str) -> StorageResult<()> {
        check_domain(domain)?;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM site_info WHERE domain = ?1", params![domain])?;
            tx.execute("DELETE FROM site_pages WHERE domain = ?1", params![domain])?;
            tx.execute("DELETE FROM site_links WHERE domain = ?1", params![domain])?;
            tx.commit()?;
            Ok(())
        })
    }

    fn queue_site_for_processing(&self, domain: &str) -> StorageResult<String> {
        check_domain(domain)?;

        let id = self.with_conn(|conn| {
            let now = now_millis();
            conn.execute(
                "INSERT INTO site_queue (payload, created_at, visible_at) VALUES (?1, ?2, ?2)",
                params![domain, now],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        let adds = self.queue_adds.fetch_add(1, Ordering::SeqCst) + 1;
        if adds >= self.queue_clean_interval {
            self.queue_adds.store(0, Ordering::SeqCst);
            let removed = self.clean_queue()?;
            debug!(removed, "compacted processing queue");
        }

        Ok(id.to_string())
    }

    fn get_next_site_for_processing(&self) -> StorageResult<Option<String>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let now = now_millis();

            let Some(message) = lease_message(&tx, now)? else {
                return Ok(None);
            };
            ack_message(&tx, &message.ack, now)?;
            tx.commit()?;

            debug!(id = message.id, domain = %message.payload, "dequeued site");
            Ok(Some(message.payload))
        })
    }

    fn get_process_queue_size(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM site_queue WHERE deleted = 0 AND visible_at <= ?1",
                params![now_millis()],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }

    fn clean_queue(&self) -> StorageResult<usize> {
        self.with_conn(|conn| clean_messages(conn))
    }

    fn close(&self) -> StorageResult<()> {
        let mut guard = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
            info!("site repository closed");
        }
        Ok(())
    }
}

fn write_info(conn: &Connection, info: &SiteInfo) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO site_info
            (domain, progress, status, status_description, status_time, page_count, link_count, refresh_enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            info.domain,
            i64::from(info.progress),
            info.status.to_db_string(),
            info.status_description,
            info.status_time.timestamp_millis(),
            info.page_count as i64,
            info.link_count as i64,
            info.refresh_enabled,
        ],
    )?;
    Ok(())
}

fn read_info(conn: &Connection, domain: &str) -> StorageResult<Option<SiteInfo>> {
    let row = conn
        .query_row(
            "SELECT progress, status, status_description, status_time, page_count, link_count, refresh_enabled
             FROM site_info WHERE domain = ?1",
            params![domain],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((progress, status, description, status_time, page_count, link_count, refresh)) = row
    else {
        return Ok(None);
    };

    let status = SiteStatus::from_db_string(&status)
        .ok_or_else(|| StorageError::Corrupt(format!("site status '{}'", status)))?;

    Ok(Some(SiteInfo {
        domain: domain.to_string(),
        progress: progress.clamp(0, 100) as u8,
        status,
        status_description: description,
        status_time: millis_to_time(status_time)?,
        page_count: page_count.max(0) as usize,
        link_count: link_count.max(0) as usize,
        refresh_enabled: refresh,
    }))
}

fn write_contents(conn: &Connection, domain: &str, contents: &SiteContents) -> StorageResult<()> {
    conn.execute("DELETE FROM site_pages WHERE domain = ?1", params![domain])?;
    conn.execute("DELETE FROM site_links WHERE domain = ?1", params![domain])?;

    let mut insert_page = conn.prepare(
        "INSERT INTO site_pages
            (domain, page_id, position, url, title, distance_from_root, http_status, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut insert_link = conn.prepare(
        "INSERT OR IGNORE INTO site_links (domain, from_page_id, to_page_id, position)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for (position, page) in contents.pages.iter().enumerate() {
        insert_page.execute(params![
            domain,
            page.id as i64,
            position as i64,
            page.url,
            page.title,
            i64::from(page.distance_from_root),
            page.http_status,
            page.status.to_db_string(),
        ])?;

        for (link_position, target) in page.links_to.iter().enumerate() {
            insert_link.execute(params![
                domain,
                page.id as i64,
                *target as i64,
                link_position as i64
            ])?;
        }
    }

    Ok(())
}

fn read_contents(conn: &Connection, domain: &str) -> StorageResult<SiteContents> {
    let mut stmt = conn.prepare(
        "SELECT page_id, url, title, distance_from_root, http_status, status
         FROM site_pages WHERE domain = ?1 ORDER BY position",
    )?;

    let rows = stmt
        .query_map(params![domain], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut pages = Vec::with_capacity(rows.len());
    let mut index_of: HashMap<usize, usize> = HashMap::new();
    for (id, url, title, distance, http_status, status) in rows {
        let status = PageStatus::from_db_string(&status)
            .ok_or_else(|| StorageError::Corrupt(format!("page status '{}'", status)))?;
        let id = id.max(0) as usize;
        index_of.insert(id, pages.len());
        pages.push(Page {
            id,
            url,
            title,
            distance_from_root: distance.clamp(0, i64::from(u32::MAX)) as u32,
            http_status: http_status.and_then(|s| u16::try_from(s).ok()),
            status,
            links_to: Vec::new(),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT from_page_id, to_page_id FROM site_links
         WHERE domain = ?1 ORDER BY from_page_id, position",
    )?;
    let links = stmt
        .query_map(params![domain], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (from, to) in links {
        if let Some(&index) = index_of.get(&(from.max(0) as usize)) {
            pages[index].links_to.push(to.max(0) as usize);
        }
    }

    Ok(SiteContents { pages })
}

/// Leases the oldest visible message
fn lease_message(conn: &Connection, now: i64) -> StorageResult<Option<QueueMessage>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, payload FROM site_queue
             WHERE deleted = 0 AND visible_at <= ?1
             ORDER BY id LIMIT 1",
            params![now],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((id, payload)) = row else {
        return Ok(None);
    };

    let ack = Uuid::new_v4().to_string();
    conn.execute(
        "UPDATE site_queue SET ack = ?1, visible_at = ?2, tries = tries + 1 WHERE id = ?3",
        params![ack, now + LEASE_MILLIS, id],
    )?;

    Ok(Some(QueueMessage { id, ack, payload }))
}

/// Marks a leased message as deleted
fn ack_message(conn: &Connection, ack: &str, now: i64) -> StorageResult<()> {
    let updated = conn.execute(
        "UPDATE site_queue SET deleted = 1 WHERE ack = ?1 AND visible_at > ?2 AND deleted = 0",
        params![ack, now],
    )?;

    if updated == 0 {
        return Err(StorageError::UnknownAck(ack.to_string()));
    }
    Ok(())
}

fn clean_messages(conn: &Connection) -> StorageResult<usize> {
    Ok(conn.execute("DELETE FROM site_queue WHERE deleted = 1", [])?)
}
