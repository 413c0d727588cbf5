//! Storage module for site snapshots and the processing queue
//!
//! This module handles all database operations:
//! - SQLite schema management
//! - Site info and contents persistence
//! - The durable processing queue (enqueue, lease, acknowledge, clean)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteSiteRepository;
pub use traits::{SiteRepository, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the site repository at `path`
pub fn open_repository(path: &Path) -> StorageResult<SqliteSiteRepository> {
    SqliteSiteRepository::open(path)
}
