//! Storage traits and error types
//!
//! This module defines the repository interface shared by the crawler, the
//! mapping engine, and the mapping client.

use crate::site::Site;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid domain: '{0}'")]
    InvalidDomain(String),

    #[error("Site already exists: {0}")]
    AlreadyExists(String),

    #[error("Site not found: {0}")]
    NotFound(String),

    #[error("Unknown queue acknowledgement: {0}")]
    UnknownAck(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Repository is closed")]
    Closed,

    #[error("Repository lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable store of site snapshots plus the processing queue
///
/// Every operation taking a domain rejects invalid domains with
/// [`StorageError::InvalidDomain`]. Implementations are shared between tasks,
/// so all methods take `&self`.
pub trait SiteRepository: Send + Sync {
    /// Writes a site's info and, when present, its contents
    ///
    /// With `overwrite == false` an existing site is an error. With
    /// `update_only == true` a missing site is an error. Contents are replaced
    /// as a unit; `None` leaves stored contents untouched. The stored status
    /// time never moves backwards; the returned site carries the time stored.
    fn save_site(&self, site: &Site, overwrite: bool, update_only: bool) -> StorageResult<Site>;

    /// Loads a site
    ///
    /// Contents are loaded only when requested and when `cached_timestamp`
    /// differs from the stored status time.
    fn get_site(
        &self,
        domain: &str,
        include_contents: bool,
        cached_timestamp: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<Site>>;

    /// Deletes a site's info and contents
    fn remove_site(&self, domain: &str) -> StorageResult<()>;

    /// Enqueues a domain and returns the queue message id
    fn queue_site_for_processing(&self, domain: &str) -> StorageResult<String>;

    /// Dequeues and acknowledges the next domain, if any
    fn get_next_site_for_processing(&self) -> StorageResult<Option<String>>;

    /// Number of domains waiting in the queue
    fn get_process_queue_size(&self) -> StorageResult<u64>;

    /// Purges acknowledged queue messages, returning how many were removed
    fn clean_queue(&self) -> StorageResult<usize>;

    /// Releases the underlying store; later calls fail with [`StorageError::Closed`]
    fn close(&self) -> StorageResult<()>;
}
