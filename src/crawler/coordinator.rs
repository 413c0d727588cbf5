//! Site crawler - one domain's crawl session
//!
//! A [`SiteCrawler`] owns the crawl of a single domain from the first
//! "Processing" save to the final snapshot:
//! - Fetching robots.txt and honoring its rules
//! - Selecting frontier pages nearest to the root first
//! - Keeping a bounded number of fetches in flight
//! - Growing the page graph from parsed links
//! - Checkpointing progress to the repository
//! - Deleting the site instead of saving when cancelled

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchError, FetchResponse, Fetcher};
use crate::crawler::parser::{decode_body, parse_html};
use crate::crawler::scheduler::{politeness_delay, CrawlBudget};
use crate::domain::{has_binary_extension, is_external_link, validated_domain};
use crate::robots::{fetch_robots, ParsedRobots};
use crate::site::{build_contents, PageGraph, Site, SiteInfo};
use crate::state::{PageStatus, SiteStatus};
use crate::storage::SiteRepository;
use crate::CrawlError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const ROOT_PAGE: usize = 0;

const ROBOTS_BLOCKED: &str = "Cannot process the site because of the robots.txt settings";
const HOME_PAGE_UNAVAILABLE: &str = "Cannot get the home page of this site";

type FetchOutcome = (usize, Result<FetchResponse, FetchError>);

/// Crawler for a single domain
pub struct SiteCrawler {
    domain: String,
    repository: Arc<dyn SiteRepository>,
    fetcher: Arc<dyn Fetcher>,
    config: CrawlerConfig,
    robots_agent: String,
    cancel: CancellationToken,
}

impl SiteCrawler {
    /// Creates a crawler for `domain`
    ///
    /// The domain is normalized first and must pass the FQDN check.
    pub fn new(
        domain: &str,
        repository: Arc<dyn SiteRepository>,
        fetcher: Arc<dyn Fetcher>,
        config: &Config,
    ) -> Result<Self, CrawlError> {
        let domain =
            validated_domain(domain).ok_or_else(|| CrawlError::InvalidDomain(domain.to_string()))?;

        Ok(Self {
            domain,
            repository,
            fetcher,
            config: config.crawler.clone(),
            robots_agent: config.user_agent.crawler_name.clone(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Requests cancellation; safe to call any number of times
    pub fn cancel_processing(&self) {
        if !self.cancel.is_cancelled() {
            info!(domain = %self.domain, "cancellation requested");
        }
        self.cancel.cancel();
    }

    /// Token that cancels this crawl when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls the site and saves the final snapshot
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Site))` - The saved final snapshot
    /// * `Ok(None)` - The crawl was cancelled and the site deleted
    /// * `Err(CrawlError)` - The final save failed
    pub async fn crawl(&self) -> Result<Option<Site>, CrawlError> {
        info!(domain = %self.domain, "starting crawl");
        CrawlSession::new(self).run().await
    }
}

/// Working state of one `crawl()` call
struct CrawlSession<'a> {
    crawler: &'a SiteCrawler,
    graph: PageGraph,
    budget: CrawlBudget,
    status: SiteStatus,
    description: Option<String>,
    processed: usize,
    last_checkpoint: usize,
    last_saved: usize,
    cannot_process_root: bool,
    connection_problem: bool,
    robots_problem: bool,
    robots: Option<ParsedRobots>,
    politeness: Duration,
    in_flight: JoinSet<FetchOutcome>,
}

impl<'a> CrawlSession<'a> {
    fn new(crawler: &'a SiteCrawler) -> Self {
        Self {
            crawler,
            graph: PageGraph::new(),
            budget: CrawlBudget::new(&crawler.config),
            status: SiteStatus::Processing,
            description: None,
            processed: 0,
            last_checkpoint: 0,
            last_saved: 0,
            cannot_process_root: false,
            connection_problem: false,
            robots_problem: false,
            robots: None,
            politeness: crawler.config.crawl_delay(),
            in_flight: JoinSet::new(),
        }
    }

    fn domain(&self) -> &str {
        &self.crawler.domain
    }

    fn cancelled(&self) -> bool {
        self.crawler.cancel.is_cancelled()
    }

    async fn run(mut self) -> Result<Option<Site>, CrawlError> {
        if let Err(e) = self.save() {
            warn!(domain = %self.domain(), error = %e, "initial save failed");
        }

        self.load_robots().await;

        if self.cancelled() {
            self.delete_site();
            return Ok(None);
        }

        self.graph.add_page(&format!("http://{}/", self.domain()), 0);

        self.process_pages().await;

        if self.cancelled() {
            // Fetches still running finish on their own; their results are dropped
            self.in_flight.detach_all();
            self.delete_site();
            return Ok(None);
        }

        self.status = self.final_status();
        let site = self.save().map_err(|source| CrawlError::FinalSave {
            domain: self.domain().to_string(),
            source,
        })?;

        info!(
            domain = %self.domain(),
            status = %site.info.status,
            pages = site.info.page_count,
            links = site.info.link_count,
            "finished crawl"
        );
        Ok(Some(site))
    }

    async fn load_robots(&mut self) {
        let cancel = self.crawler.cancel.clone();
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = fetch_robots(
                self.crawler.fetcher.as_ref(),
                &self.crawler.domain,
                self.crawler.config.robots_timeout(),
            ) => fetched,
        };

        match fetched {
            Ok(Some(robots)) => {
                let delay = robots.crawl_delay_duration(&self.crawler.robots_agent);
                self.politeness = politeness_delay(
                    self.crawler.config.crawl_delay(),
                    delay,
                    self.crawler.config.max_crawl_delay(),
                );
                debug!(
                    domain = %self.domain(),
                    delay_ms = self.politeness.as_millis() as u64,
                    "loaded robots.txt"
                );
                self.robots = Some(robots);
            }
            Ok(None) => debug!(domain = %self.domain(), "no robots.txt restrictions"),
            Err(e) => warn!(
                domain = %self.domain(),
                error = %e,
                "robots.txt unavailable, crawling without restrictions"
            ),
        }
    }

    async fn process_pages(&mut self) {
        let cancel = self.crawler.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.budget.checkpoint_due(self.processed, self.last_checkpoint) {
                if let Err(e) = self.save() {
                    warn!(domain = %self.domain(), error = %e, "checkpoint save failed");
                }
                self.last_checkpoint = self.processed;
                continue;
            }

            let dispatched = self.dispatch_batch().await;

            if !self.in_flight.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    joined = self.in_flight.join_next() => {
                        if let Some(joined) = joined {
                            self.apply_joined(joined);
                        }
                    }
                }
            } else if dispatched {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.politeness) => {}
                }
            } else {
                break;
            }
        }
    }

    /// Moves the next frontier pages to `Processing`
    ///
    /// Returns whether any page was dispatched.
    async fn dispatch_batch(&mut self) -> bool {
        if !self.budget.dispatch_allowed(self.last_saved, self.processed) {
            return false;
        }

        let batch = self
            .graph
            .frontier(self.budget.free_slots(self.in_flight.len()));
        let cancel = self.crawler.cancel.clone();
        let mut dispatched = false;

        for id in batch {
            if cancel.is_cancelled() {
                break;
            }

            if let Some(page) = self.graph.get_mut(id) {
                page.status = PageStatus::Processing;
            }
            self.begin_page(id);
            dispatched = true;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.politeness) => {}
            }
        }

        dispatched
    }

    fn begin_page(&mut self, id: usize) {
        if self.cancelled() {
            return;
        }
        let Some(page) = self.graph.get(id) else {
            return;
        };
        if page.status != PageStatus::Processing {
            return;
        }
        let url = page.url.clone();

        self.processed += 1;
        if self.budget.over_ceiling(self.processed) {
            return;
        }

        let allowed = self
            .robots
            .as_ref()
            .map_or(true, |robots| robots.is_allowed(&url, &self.crawler.robots_agent));
        if !allowed {
            debug!(domain = %self.domain(), url = %url, "blocked by robots.txt");
            if let Some(page) = self.graph.get_mut(id) {
                page.status = PageStatus::UnprocessedBecauseOfRobotsTxt;
            }
            if id == ROOT_PAGE {
                self.cannot_process_root = true;
                self.robots_problem = true;
                self.description = Some(ROBOTS_BLOCKED.to_string());
            }
            return;
        }

        let fetcher = Arc::clone(&self.crawler.fetcher);
        let timeout = self.crawler.config.request_timeout();
        self.in_flight.spawn(async move {
            let result = fetcher.fetch(&url, timeout).await;
            (id, result)
        });
    }

    fn apply_joined(&mut self, joined: Result<FetchOutcome, JoinError>) {
        match joined {
            Ok((id, result)) => self.apply_result(id, result),
            Err(e) => warn!(domain = %self.domain(), error = %e, "fetch task failed"),
        }
    }

    fn apply_result(&mut self, id: usize, result: Result<FetchResponse, FetchError>) {
        if self.cancelled() {
            return;
        }
        let Some(page) = self.graph.get(id) else {
            return;
        };
        let page_url = page.url.clone();
        let is_root = id == ROOT_PAGE;

        let response = match result {
            Ok(response) if !response.is_error() => response,
            Ok(response) => {
                debug!(url = %page_url, status = response.status_code, "error status");
                self.mark_error(id, Some(response.status_code));
                if is_root {
                    self.cannot_process_root = true;
                    self.description = Some(HOME_PAGE_UNAVAILABLE.to_string());
                }
                return;
            }
            Err(e) => {
                debug!(url = %page_url, error = %e, "fetch failed");
                self.mark_error(id, None);
                if is_root {
                    self.cannot_process_root = true;
                    self.connection_problem = true;
                    self.description = Some(HOME_PAGE_UNAVAILABLE.to_string());
                }
                return;
            }
        };

        let mut title = String::new();
        let mut links = Vec::new();

        if response.is_redirect() {
            if let Some(link) = response
                .location
                .as_deref()
                .and_then(|location| resolve_location(&page_url, location))
            {
                if is_root && is_external_link(&link, self.domain()) {
                    self.cannot_process_root = true;
                    self.description = Some(format!(
                        "Home page of this site is redirected to another domain ({})",
                        link
                    ));
                }
                links.push(link);
            }
        } else if response.is_success() {
            if !response.is_html() {
                if let Some(page) = self.graph.get_mut(id) {
                    page.http_status = Some(response.status_code);
                    page.status = PageStatus::Binary;
                }
                if is_root {
                    self.cannot_process_root = true;
                    self.description = Some(HOME_PAGE_UNAVAILABLE.to_string());
                }
                return;
            }

            let html = decode_body(&response.body, response.content_type.as_deref());
            let parsed = parse_html(&html, &page_url);
            title = parsed.title;
            links = parsed.links;
        } else if is_root {
            self.cannot_process_root = true;
            self.description = Some(HOME_PAGE_UNAVAILABLE.to_string());
        }

        let domain = self.crawler.domain.as_str();
        let internal: Vec<String> = links
            .into_iter()
            .filter(|link| !is_external_link(link, domain) && !has_binary_extension(link))
            .collect();
        self.graph.add_links(id, &internal);

        if let Some(page) = self.graph.get_mut(id) {
            page.http_status = Some(response.status_code);
            page.status = PageStatus::Processed;
            page.title = title;
        }
    }

    fn mark_error(&mut self, id: usize, http_status: Option<u16>) {
        if let Some(page) = self.graph.get_mut(id) {
            if http_status.is_some() {
                page.http_status = http_status;
            }
            page.status = PageStatus::Error;
        }
    }

    /// Site status from the problem flags, connection problems first
    fn final_status(&self) -> SiteStatus {
        if self.connection_problem {
            SiteStatus::ConnectionProblem
        } else if self.robots_problem {
            SiteStatus::RobotsTxtProblem
        } else if self.description.is_some() {
            SiteStatus::ProcessedWithProblems
        } else {
            SiteStatus::Processed
        }
    }

    /// Saves the current snapshot, rebuilt from the page graph
    fn save(&mut self) -> Result<Site, crate::storage::StorageError> {
        let running = self.status == SiteStatus::Processing;
        let mut info = SiteInfo::new(self.domain());
        info.status = self.status;
        info.status_time = Utc::now();
        if !running {
            info.status_description = self.description.clone();
        }

        let site = if self.cannot_process_root {
            info.progress = if running {
                self.budget.processed_progress(self.processed)
            } else {
                100
            };
            Site {
                info,
                contents: None,
            }
        } else {
            let (contents, link_count) = build_contents(self.graph.pages(), self.domain());
            info.page_count = contents.pages.len();
            info.link_count = link_count;
            info.progress = if running {
                self.budget.snapshot_progress(info.page_count)
            } else {
                100
            };
            self.last_saved = info.page_count;
            Site {
                info,
                contents: Some(contents),
            }
        };

        self.crawler.repository.save_site(&site, true, false)
    }

    fn delete_site(&self) {
        match self.crawler.repository.remove_site(self.domain()) {
            Ok(()) => info!(domain = %self.domain(), "crawl cancelled, site deleted"),
            Err(e) => warn!(domain = %self.domain(), error = %e, "crawl cancelled, delete failed"),
        }
    }
}

/// Resolves a `Location` header against the page URL
fn resolve_location(page_url: &str, location: &str) -> Option<String> {
    let mut url = Url::parse(page_url).ok()?.join(location.trim()).ok()?;
    url.set_fragment(None);
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}
