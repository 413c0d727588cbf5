//! Dispatch policy for a single site crawl
//!
//! This module holds the arithmetic the crawl loop consults:
//! - Hard ceilings on how many pages a crawl may dispatch
//! - The per-crawl in-flight bound
//! - When a checkpoint save is due
//! - Progress percentages
//! - The effective politeness delay, honoring robots.txt `Crawl-delay`

use crate::config::{CrawlerConfig, MAX_DESIRED_PAGES};
use std::time::Duration;

/// Budget and pacing of one site crawl
#[derive(Debug, Clone)]
pub struct CrawlBudget {
    desired_pages: usize,
    max_in_flight: usize,
    checkpoint_interval: usize,
}

impl CrawlBudget {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            desired_pages: config.desired_number_of_pages.clamp(1, MAX_DESIRED_PAGES),
            max_in_flight: config.max_simultaneous_requests.max(1),
            checkpoint_interval: config.checkpoint_interval.max(1),
        }
    }

    /// Hard ceiling on dispatched pages
    pub fn processed_ceiling(&self) -> usize {
        self.desired_pages.saturating_mul(2)
    }

    /// Whether new pages may still be selected from the frontier
    ///
    /// Dispatch stops once the last snapshot reached the page budget or the
    /// crawl dispatched twice the budget.
    pub fn dispatch_allowed(&self, last_saved_pages: usize, processed: usize) -> bool {
        last_saved_pages < self.desired_pages && processed < self.processed_ceiling()
    }

    /// Whether a dispatched page went past the ceiling and must be skipped
    pub fn over_ceiling(&self, processed: usize) -> bool {
        processed > self.processed_ceiling()
    }

    /// Free fetch slots given the current in-flight count
    pub fn free_slots(&self, in_flight: usize) -> usize {
        self.max_in_flight.saturating_sub(in_flight)
    }

    pub fn checkpoint_due(&self, processed: usize, last_checkpoint: usize) -> bool {
        processed > last_checkpoint.saturating_add(self.checkpoint_interval)
    }

    /// Progress of a running crawl from the size of its last snapshot
    pub fn snapshot_progress(&self, saved_pages: usize) -> u8 {
        (saved_pages.saturating_mul(100) / self.desired_pages).min(99) as u8
    }

    /// Progress of a running crawl whose home page failed
    pub fn processed_progress(&self, processed: usize) -> u8 {
        (processed.saturating_mul(100) / self.processed_ceiling()).min(99) as u8
    }
}

/// Effective pause between dispatches
///
/// A robots.txt `Crawl-delay` longer than the configured delay wins, up to
/// `robots_cap`.
pub fn politeness_delay(
    configured: Duration,
    robots: Option<Duration>,
    robots_cap: Duration,
) -> Duration {
    match robots {
        Some(robots) => configured.max(robots.min(robots_cap)),
        None => configured,
    }
}
