//! Shared helpers for integration tests
//!
//! Crawl domains must be real FQDNs, so crawler and engine tests fake the
//! network at the `Fetcher` seam instead of using a mock server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use site_mapper::config::Config;
use site_mapper::crawler::{FetchError, FetchResponse, Fetcher};
use site_mapper::storage::{SiteRepository, SqliteSiteRepository, StorageError, StorageResult};
use site_mapper::{Site, SiteInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Configuration with no politeness delay and a short engine poll
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.crawler.crawl_delay = 0;
    config.engine.poll_interval = 10;
    config
}

enum Route {
    Respond(FetchResponse),
    Timeout,
}

/// In-process fetcher serving scripted responses
///
/// Unknown URLs get a 404. Every request is recorded, and the highest number
/// of simultaneous requests is tracked.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: HashMap<String, Route>,
    delay: Duration,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.respond(url, 200, Some("text/html; charset=utf-8"), None, body.as_bytes())
    }

    pub fn status(self, url: &str, status_code: u16) -> Self {
        self.respond(url, status_code, Some("text/html"), None, b"")
    }

    pub fn binary(self, url: &str, content_type: &str) -> Self {
        self.respond(url, 200, Some(content_type), None, &[0x25, 0x50, 0x44, 0x46])
    }

    pub fn redirect(self, url: &str, location: &str) -> Self {
        self.respond(url, 301, None, Some(location), b"")
    }

    pub fn robots(self, domain: &str, body: &str) -> Self {
        let url = format!("http://{}/robots.txt", domain);
        self.respond(&url, 200, Some("text/plain"), None, body.as_bytes())
    }

    /// Fails every request to `url` as a timeout
    pub fn timeout(mut self, url: &str) -> Self {
        self.routes.insert(url.to_string(), Route::Timeout);
        self
    }

    fn respond(
        mut self,
        url: &str,
        status_code: u16,
        content_type: Option<&str>,
        location: Option<&str>,
        body: &[u8],
    ) -> Self {
        self.routes.insert(
            url.to_string(),
            Route::Respond(FetchResponse {
                status_code,
                content_type: content_type.map(String::from),
                location: location.map(String::from),
                body: body.to_vec(),
            }),
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requests().iter().any(|r| r == url)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.routes.get(url) {
            Some(Route::Respond(response)) => Ok(response.clone()),
            Some(Route::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            None => Ok(FetchResponse {
                status_code: 404,
                content_type: Some("text/html".to_string()),
                ..Default::default()
            }),
        }
    }
}

/// SQLite repository that records saves and can be told to fail
pub struct RecordingRepository {
    inner: SqliteSiteRepository,
    saves: Mutex<Vec<SiteInfo>>,
    fail_saves: AtomicBool,
    fail_enqueue: AtomicBool,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self {
            inner: SqliteSiteRepository::open_in_memory().unwrap(),
            saves: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            fail_enqueue: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    /// Infos of every attempted save, in order
    pub fn saves(&self) -> Vec<SiteInfo> {
        self.saves.lock().unwrap().clone()
    }
}

impl SiteRepository for RecordingRepository {
    fn save_site(&self, site: &Site, overwrite: bool, update_only: bool) -> StorageResult<Site> {
        self.saves.lock().unwrap().push(site.info.clone());
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        self.inner.save_site(site, overwrite, update_only)
    }

    fn get_site(
        &self,
        domain: &str,
        include_contents: bool,
        cached_timestamp: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<Site>> {
        self.inner.get_site(domain, include_contents, cached_timestamp)
    }

    fn remove_site(&self, domain: &str) -> StorageResult<()> {
        self.inner.remove_site(domain)
    }

    fn queue_site_for_processing(&self, domain: &str) -> StorageResult<String> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        self.inner.queue_site_for_processing(domain)
    }

    fn get_next_site_for_processing(&self) -> StorageResult<Option<String>> {
        self.inner.get_next_site_for_processing()
    }

    fn get_process_queue_size(&self) -> StorageResult<u64> {
        self.inner.get_process_queue_size()
    }

    fn clean_queue(&self) -> StorageResult<usize> {
        self.inner.clean_queue()
    }

    fn close(&self) -> StorageResult<()> {
        self.inner.close()
    }
}

/// Polls `condition` every 10ms for up to `limit`
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
