//! Crawler module for fetching and mapping a single site
//!
//! This module contains the per-site crawling logic, including:
//! - HTTP fetching with transport-level retries
//! - Charset detection, HTML parsing and link extraction
//! - Page budget and politeness policy
//! - The crawl session itself

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::SiteCrawler;
pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use parser::{decode_body, detect_encoding, parse_html, ParsedPage};
pub use scheduler::{politeness_delay, CrawlBudget};
