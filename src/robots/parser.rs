//! Robots.txt rule set
//!
//! Permission checks are delegated to the robotstxt crate's matcher. The
//! `Crawl-delay` extension is read by a small group-aware scan.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Set when no robots.txt could be used
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a rule set from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive rule set that allows everything
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a URL (or path) is allowed for the given product token
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the `Crawl-delay` for a product token, in seconds
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all {
            return None;
        }

        let agent = product_token(user_agent).to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut for_agent = None;
        let mut for_wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive user-agent lines share one group
                if !group_open {
                    group.clear();
                    group_open = true;
                }
                let name = if value == "*" { value } else { product_token(value) };
                group.push(name.to_lowercase());
                continue;
            }
            group_open = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };

            for name in &group {
                if name == "*" {
                    for_wildcard.get_or_insert(delay);
                } else if !name.is_empty() && *name == agent {
                    for_agent.get_or_insert(delay);
                }
            }
        }

        for_agent.or(for_wildcard)
    }

    /// `Crawl-delay` as a duration
    ///
    /// Negative, non-finite and unrepresentable values are ignored.
    pub fn crawl_delay_duration(&self, user_agent: &str) -> Option<Duration> {
        self.crawl_delay(user_agent)
            .and_then(|d| Duration::try_from_secs_f64(d).ok())
    }
}

/// Leading product token of a user-agent value (`FooBot/1.2` gives `FooBot`)
fn product_token(value: &str) -> &str {
    let end = value
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(value.len());
    &value[..end]
}
