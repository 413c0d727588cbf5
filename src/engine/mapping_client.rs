//! Mapping client - read path for site snapshots and write path into the queue
//!
//! Reading a site also decides whether the stored snapshot is stale enough to
//! be mapped again. A stale site gets a fresh `Added` placeholder and is
//! enqueued for the engine.

use crate::config::{
    ClientConfig, MAX_INTERRUPTED_RETRY_HOURS, MAX_PROBLEM_RETRY_MINUTES, MAX_REFRESH_PERIOD_DAYS,
};
use crate::domain::validated_domain;
use crate::site::{Site, SiteInfo};
use crate::state::SiteStatus;
use crate::storage::SiteRepository;
use crate::MapperError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Staleness policy over the site repository
pub struct MappingClient {
    repository: Arc<dyn SiteRepository>,
    config: ClientConfig,
}

impl MappingClient {
    pub fn new(repository: Arc<dyn SiteRepository>, config: ClientConfig) -> Self {
        Self { repository, config }
    }

    /// Loads a site, enqueueing it for mapping when its snapshot is stale
    ///
    /// # Arguments
    ///
    /// * `domain` - Domain or URL of the site; normalized before use
    /// * `include_contents` - Whether pages are returned
    /// * `cached_timestamp` - Status time of the caller's copy; contents are
    ///   omitted when it matches the stored one
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Site))` - The stored snapshot, or the new placeholder
    /// * `Ok(None)` - The site is unknown and could not be enqueued
    /// * `Err(MapperError::InvalidDomain)` - The domain failed validation
    pub fn get_site(
        &self,
        domain: &str,
        include_contents: bool,
        cached_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Option<Site>, MapperError> {
        let domain =
            validated_domain(domain).ok_or_else(|| MapperError::InvalidDomain(domain.to_string()))?;

        let existing = self
            .repository
            .get_site(&domain, include_contents, cached_timestamp)?;

        if !needs_processing(existing.as_ref().map(|s| &s.info), Utc::now(), &self.config) {
            return Ok(existing);
        }

        match self.enqueue(&domain) {
            Ok(mut placeholder) => {
                if !include_contents {
                    placeholder.contents = None;
                }
                Ok(Some(placeholder))
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "failed to queue site for mapping");
                Ok(existing)
            }
        }
    }

    fn enqueue(&self, domain: &str) -> Result<Site, MapperError> {
        let placeholder = self.repository.save_site(&Site::new(domain), true, false)?;
        let message_id = self.repository.queue_site_for_processing(domain)?;
        info!(domain = %domain, message_id = %message_id, "site queued for mapping");
        Ok(placeholder)
    }
}

/// Whether a site should be mapped (again)
///
/// A missing site always needs mapping. Otherwise nothing is refreshed when
/// refresh is disabled for the site, and a snapshot is stale when:
/// - it is older than the refresh period
/// - it ended with a connection or robots.txt problem a while ago
/// - it has been `Added` or `Processing` for too long, as after a crash
pub fn needs_processing(
    info: Option<&SiteInfo>,
    now: DateTime<Utc>,
    config: &ClientConfig,
) -> bool {
    let Some(info) = info else {
        return true;
    };
    if !info.refresh_enabled {
        return false;
    }

    let age = now - info.status_time;
    let refresh = Duration::days(config.refresh_period_days.clamp(0, MAX_REFRESH_PERIOD_DAYS));
    let problem_retry =
        Duration::minutes(config.problem_retry_minutes.clamp(0, MAX_PROBLEM_RETRY_MINUTES));
    let interrupted_retry =
        Duration::hours(config.interrupted_retry_hours.clamp(0, MAX_INTERRUPTED_RETRY_HOURS));

    age > refresh
        || (info.status.is_retryable_problem() && age > problem_retry)
        || (matches!(info.status, SiteStatus::Added | SiteStatus::Processing)
            && age > interrupted_retry)
}
