//! Mapping engine - bounded multi-site scheduler
//!
//! The engine pulls domains from the repository's processing queue and runs
//! up to `max-capacity` site crawls at once. It owns the registry of active
//! crawls, never starts a second crawl for a domain already being mapped, and
//! cancels and drains every crawl when stopped.

use crate::config::Config;
use crate::crawler::{Fetcher, SiteCrawler};
use crate::site::Site;
use crate::storage::SiteRepository;
use crate::CrawlError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type CrawlOutcome = (String, Result<Option<Site>, CrawlError>);

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    StopRequested,
    Drained,
}

/// Counters published by a running engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    active: AtomicUsize,
    peak_active: AtomicUsize,
    started: AtomicU64,
    finished: AtomicU64,
}

impl EngineMetrics {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneous crawls seen so far
    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::Relaxed)
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::Relaxed)
    }

    fn record_start(&self, active: usize) {
        self.started.fetch_add(1, Ordering::Relaxed);
        self.active.store(active, Ordering::Relaxed);
        self.peak_active.fetch_max(active, Ordering::Relaxed);
    }

    fn record_finish(&self, active: usize) {
        self.finished.fetch_add(1, Ordering::Relaxed);
        self.active.store(active, Ordering::Relaxed);
    }
}

/// Registry entry of a running crawl
struct ActiveCrawl {
    cancel: CancellationToken,
    /// Cancelled when the crawl task ends, even by panic
    done: CancellationToken,
}

/// Scheduler of concurrent site crawls
pub struct MappingEngine {
    repository: Arc<dyn SiteRepository>,
    fetcher: Arc<dyn Fetcher>,
    config: Config,
    active: HashMap<String, ActiveCrawl>,
    tasks: JoinSet<CrawlOutcome>,
    metrics: Arc<EngineMetrics>,
    state: watch::Sender<EngineState>,
}

impl MappingEngine {
    pub fn new(
        repository: Arc<dyn SiteRepository>,
        fetcher: Arc<dyn Fetcher>,
        config: Config,
    ) -> Self {
        let (state, _) = watch::channel(EngineState::Running);
        Self {
            repository,
            fetcher,
            config,
            active: HashMap::new(),
            tasks: JoinSet::new(),
            metrics: Arc::new(EngineMetrics::default()),
            state,
        }
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Subscribes to state changes
    pub fn state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Spawns the engine loop and returns a handle to stop it
    pub fn start(self) -> EngineHandle {
        let shutdown = CancellationToken::new();
        let state = self.state();
        let metrics = self.metrics();
        let join = tokio::spawn(self.run(shutdown.clone()));

        EngineHandle {
            shutdown,
            state,
            metrics,
            join,
        }
    }

    /// Runs until `shutdown` is cancelled, then cancels and drains all crawls
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            max_capacity = self.config.engine.max_capacity,
            "mapping engine started"
        );

        loop {
            while let Some(joined) = self.tasks.try_join_next() {
                self.finish(joined);
            }

            if shutdown.is_cancelled() {
                break;
            }

            if self.active.len() >= self.config.engine.max_capacity {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    Some(joined) = self.tasks.join_next() => self.finish(joined),
                }
                continue;
            }

            match self.repository.get_next_site_for_processing() {
                Ok(Some(domain)) => {
                    if self.active.contains_key(&domain) {
                        debug!(domain = %domain, "site is already being mapped");
                        continue;
                    }
                    if let Err(e) = self.start_crawl(&domain) {
                        warn!(domain = %domain, error = %e, "could not start crawl");
                        self.backoff(&shutdown).await;
                    }
                }
                Ok(None) => self.backoff(&shutdown).await,
                Err(e) => {
                    warn!(error = %e, "failed to read processing queue");
                    self.backoff(&shutdown).await;
                }
            }
        }

        self.drain().await;
    }

    fn start_crawl(&mut self, domain: &str) -> Result<(), CrawlError> {
        let crawler = SiteCrawler::new(
            domain,
            Arc::clone(&self.repository),
            Arc::clone(&self.fetcher),
            &self.config,
        )?;
        let domain = crawler.domain().to_string();

        let done = CancellationToken::new();
        let guard = done.clone().drop_guard();
        self.active.insert(
            domain.clone(),
            ActiveCrawl {
                cancel: crawler.cancellation_token(),
                done,
            },
        );
        self.metrics.record_start(self.active.len());
        info!(domain = %domain, active = self.active.len(), "site crawl started");

        self.tasks.spawn(async move {
            let _guard = guard;
            let result = crawler.crawl().await;
            (domain, result)
        });
        Ok(())
    }

    fn finish(&mut self, joined: Result<CrawlOutcome, JoinError>) {
        match joined {
            Ok((domain, result)) => {
                self.active.remove(&domain);
                match result {
                    Ok(Some(site)) => info!(
                        domain = %domain,
                        status = %site.info.status,
                        pages = site.info.page_count,
                        "site crawl finished"
                    ),
                    Ok(None) => info!(domain = %domain, "site crawl cancelled"),
                    Err(e) => error!(domain = %domain, error = %e, "site crawl failed"),
                }
            }
            Err(e) => {
                error!(error = %e, "site crawl task failed");
                self.active.retain(|_, crawl| !crawl.done.is_cancelled());
            }
        }
        self.metrics.record_finish(self.active.len());
    }

    /// Waits one poll interval, reaping a finished crawl if one ends first
    async fn backoff(&mut self, shutdown: &CancellationToken) {
        let sleep = tokio::time::sleep(self.config.engine.poll_interval());

        if self.tasks.is_empty() {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = sleep => {}
            }
        } else {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = sleep => {}
                Some(joined) = self.tasks.join_next() => self.finish(joined),
            }
        }
    }

    async fn drain(&mut self) {
        self.state.send_replace(EngineState::StopRequested);
        info!(active = self.active.len(), "stopping mapping engine");

        for crawl in self.active.values() {
            crawl.cancel.cancel();
        }
        while let Some(joined) = self.tasks.join_next().await {
            self.finish(joined);
        }

        self.state.send_replace(EngineState::Drained);
        info!("mapping engine drained");
    }
}

/// Handle to a spawned [`MappingEngine`]
pub struct EngineHandle {
    shutdown: CancellationToken,
    state: watch::Receiver<EngineState>,
    metrics: Arc<EngineMetrics>,
    join: JoinHandle<()>,
}

impl EngineHandle {
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Cancels every active crawl and waits until all of them have ended
    ///
    /// The repository may be closed once this returns.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "mapping engine task failed");
        }
    }
}
