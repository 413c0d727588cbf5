//! Robots.txt handling module
//!
//! This module fetches and parses a site's robots.txt. A missing or unusable
//! robots.txt means no restrictions.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::{FetchError, Fetcher};
use std::time::Duration;
use tracing::debug;

/// Maximum number of redirects followed for robots.txt
const MAX_REDIRECTS: usize = 5;

/// Fetches robots.txt for a domain
///
/// Redirects are followed up to a small limit.
///
/// # Returns
///
/// * `Ok(Some(ParsedRobots))` - robots.txt was served with a 2xx status and a body
/// * `Ok(None)` - Any other response; crawl without restrictions
/// * `Err(FetchError)` - robots.txt could not be reached at all
pub async fn fetch_robots(
    fetcher: &dyn Fetcher,
    domain: &str,
    timeout: Duration,
) -> Result<Option<ParsedRobots>, FetchError> {
    let mut url = format!("http://{}/robots.txt", domain);

    for _ in 0..=MAX_REDIRECTS {
        let response = fetcher.fetch(&url, timeout).await?;

        if response.is_redirect() {
            let next = response
                .location
                .as_deref()
                .and_then(|location| url::Url::parse(&url).ok()?.join(location).ok());
            match next {
                Some(next) => {
                    debug!(domain = %domain, from = %url, to = %next, "robots.txt redirected");
                    url = next.to_string();
                    continue;
                }
                None => return Ok(None),
            }
        }

        if response.is_success() && !response.body.is_empty() {
            let content = String::from_utf8_lossy(&response.body);
            return Ok(Some(ParsedRobots::from_content(&content)));
        }

        return Ok(None);
    }

    debug!(domain = %domain, "too many robots.txt redirects");
    Ok(None)
}
