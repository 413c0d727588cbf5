//! Site Mapper main entry point
//!
//! This is the command-line interface for the site mapper: the queue worker,
//! one-off crawls, and inspection of stored sites.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use site_mapper::config::{load_config_with_hash, validate, Config};
use site_mapper::crawler::HttpFetcher;
use site_mapper::output::{print_site_report, SiteReport};
use site_mapper::storage::{open_repository, SiteRepository, SqliteSiteRepository};
use site_mapper::{MappingClient, MappingEngine, SiteCrawler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Site Mapper: a bounded site-map crawler
///
/// Crawls web sites into graphs of pages and links, respecting robots.txt,
/// and runs many crawls concurrently from a durable work queue.
#[derive(Parser, Debug)]
#[command(name = "site-mapper")]
#[command(version = "1.0.0")]
#[command(about = "A bounded site-map crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the mapping engine on the processing queue until Ctrl-C
    Worker,

    /// Look up a site, queueing it for mapping when stale
    Map {
        domain: String,

        /// Also print the site's pages
        #[arg(long)]
        contents: bool,
    },

    /// Crawl one site in the foreground, bypassing the queue
    Crawl { domain: String },

    /// Print the stored report of a site
    Show { domain: String },

    /// Print the number of queued sites
    QueueSize,

    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Worker => handle_worker(config).await,
        Command::Map { domain, contents } => handle_map(&config, &domain, contents),
        Command::Crawl { domain } => handle_crawl(config, &domain).await,
        Command::Show { domain } => handle_show(&config, &domain),
        Command::QueueSize => handle_queue_size(&config),
        Command::CheckConfig => handle_check_config(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mapper=info,warn"),
            1 => EnvFilter::new("site_mapper=debug,info"),
            2 => EnvFilter::new("site_mapper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

fn open(config: &Config) -> Result<Arc<SqliteSiteRepository>> {
    let path = Path::new(&config.storage.database_path);
    let repository = open_repository(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?
        .with_queue_clean_interval(config.storage.queue_clean_interval);
    Ok(Arc::new(repository))
}

fn fetcher(config: &Config) -> Result<Arc<HttpFetcher>> {
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)
        .context("Failed to build HTTP client")?;
    Ok(Arc::new(fetcher))
}

/// Runs the engine until interrupted, then drains crawls and closes storage
async fn handle_worker(config: Config) -> Result<()> {
    let repository = open(&config)?;
    let engine = MappingEngine::new(repository.clone(), fetcher(&config)?, config);
    let handle = engine.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested, stopping crawlers");

    handle.stop().await;
    repository.close().context("Failed to close database")?;
    Ok(())
}

fn handle_map(config: &Config, domain: &str, contents: bool) -> Result<()> {
    let repository = open(config)?;
    let client = MappingClient::new(repository.clone(), config.client.clone());

    match client.get_site(domain, contents, None)? {
        Some(site) => {
            print_site_report(&SiteReport::from_site(&site));
            if let Some(contents) = &site.contents {
                for page in &contents.pages {
                    println!("  [{}] {} {}", page.distance_from_root, page.url, page.title);
                }
            }
        }
        None => println!("Cannot get information on this domain"),
    }

    repository.close()?;
    Ok(())
}

async fn handle_crawl(config: Config, domain: &str) -> Result<()> {
    let repository = open(&config)?;
    let crawler = SiteCrawler::new(domain, repository.clone(), fetcher(&config)?, &config)?;

    let token = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling crawl");
            token.cancel();
        }
    });

    let result = crawler.crawl().await;
    repository.close()?;

    match result? {
        Some(site) => print_site_report(&SiteReport::from_site(&site)),
        None => println!("Crawl of {} cancelled", crawler.domain()),
    }
    Ok(())
}

fn handle_show(config: &Config, domain: &str) -> Result<()> {
    let repository = open(config)?;
    let normalized = site_mapper::domain::validated_domain(domain)
        .ok_or_else(|| site_mapper::MapperError::InvalidDomain(domain.to_string()))?;

    match repository.get_site(&normalized, true, None)? {
        Some(site) => print_site_report(&SiteReport::from_site(&site)),
        None => println!("No site stored for {}", normalized),
    }
    Ok(())
}

fn handle_queue_size(config: &Config) -> Result<()> {
    let repository = open(config)?;
    println!("{}", repository.get_process_queue_size()?);
    Ok(())
}

fn handle_check_config(config: &Config) -> Result<()> {
    validate(config).context("Configuration is invalid")?;

    println!("=== Site Mapper Configuration ===\n");

    println!("Crawler:");
    println!("  Desired pages per site: {}", config.crawler.desired_number_of_pages);
    println!(
        "  Max simultaneous requests: {}",
        config.crawler.max_simultaneous_requests
    );
    println!("  Crawl delay: {}ms", config.crawler.crawl_delay);
    println!("  Max robots.txt crawl delay: {}ms", config.crawler.max_crawl_delay);
    println!("  Checkpoint interval: {} pages", config.crawler.checkpoint_interval);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!(
        "  Retries: {} attempts, {}ms apart",
        config.crawler.retry_attempts, config.crawler.retry_delay
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nEngine:");
    println!("  Max capacity: {}", config.engine.max_capacity);
    println!("  Poll interval: {}ms", config.engine.poll_interval);

    println!("\nRefresh policy:");
    println!("  Refresh after: {} days", config.client.refresh_period_days);
    println!(
        "  Retry problems after: {} minutes",
        config.client.problem_retry_minutes
    );
    println!(
        "  Restart interrupted after: {} hours",
        config.client.interrupted_retry_hours
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Queue clean interval: {} enqueues",
        config.storage.queue_clean_interval
    );

    println!("\n✓ Configuration is valid");
    Ok(())
}
