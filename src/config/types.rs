use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the site mapper
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Per-site crawl behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Page budget for a single site
    #[serde(rename = "desired-number-of-pages")]
    pub desired_number_of_pages: usize,

    /// Maximum number of fetches in flight for one site
    #[serde(rename = "max-simultaneous-requests")]
    pub max_simultaneous_requests: usize,

    /// Politeness delay between dispatches (milliseconds)
    #[serde(rename = "crawl-delay")]
    pub crawl_delay: u64,

    /// Upper bound on a robots.txt `Crawl-delay` (milliseconds)
    #[serde(rename = "max-crawl-delay")]
    pub max_crawl_delay: u64,

    /// Processed pages between two checkpoint saves
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: usize,

    /// Timeout of a single page request (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Attempts per request, counting the first one
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Pause between two attempts (milliseconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,

    /// Timeout of the robots.txt request (seconds)
    #[serde(rename = "robots-timeout")]
    pub robots_timeout: u64,
}

impl CrawlerConfig {
    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay)
    }

    pub fn max_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.max_crawl_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            desired_number_of_pages: 220,
            max_simultaneous_requests: 20,
            crawl_delay: 100,
            max_crawl_delay: 10_000,
            checkpoint_interval: 20,
            request_timeout: 40,
            retry_attempts: 3,
            retry_delay: 5000,
            robots_timeout: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Full User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteMapperBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/crawler".to_string(),
        }
    }
}

/// Multi-site scheduler configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of sites crawled at once
    #[serde(rename = "max-capacity")]
    pub max_capacity: usize,

    /// Backoff when the queue is empty or failing (milliseconds)
    #[serde(rename = "poll-interval")]
    pub poll_interval: u64,
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10,
            poll_interval: 1000,
        }
    }
}

/// Largest accepted page budget for a single site
pub const MAX_DESIRED_PAGES: usize = 1_000_000;

/// Largest accepted client refresh period, about ten years
pub const MAX_REFRESH_PERIOD_DAYS: i64 = 3650;
pub const MAX_PROBLEM_RETRY_MINUTES: i64 = MAX_REFRESH_PERIOD_DAYS * 24 * 60;
pub const MAX_INTERRUPTED_RETRY_HOURS: i64 = MAX_REFRESH_PERIOD_DAYS * 24;

/// Staleness policy of the mapping client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Age after which any snapshot is crawled again
    #[serde(rename = "refresh-period-days")]
    pub refresh_period_days: i64,

    /// Age after which a site with a connection or robots.txt problem is retried
    #[serde(rename = "problem-retry-minutes")]
    pub problem_retry_minutes: i64,

    /// Age after which a crawl stuck in Added or Processing is restarted
    #[serde(rename = "interrupted-retry-hours")]
    pub interrupted_retry_hours: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            refresh_period_days: 7,
            problem_retry_minutes: 10,
            interrupted_retry_hours: 1,
        }
    }
}

/// Repository configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Enqueues between two queue compactions
    #[serde(rename = "queue-clean-interval")]
    pub queue_clean_interval: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "site-mapper.db".to_string(),
            queue_clean_interval: 1000,
        }
    }
}
