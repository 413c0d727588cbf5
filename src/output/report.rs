//! Site report generation
//!
//! This module summarises a stored site snapshot for the command line:
//! status, page counts by status and by distance from the root, and the
//! pages that could not be retrieved.

use crate::site::Site;
use crate::state::{PageStatus, SiteStatus};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::collections::BTreeMap;

/// A page that ended in error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProblem {
    pub url: String,
    pub description: String,
}

/// Summary of a site snapshot
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub domain: String,
    pub status: SiteStatus,
    /// Progress line while mapping, else the stored status description
    pub status_line: Option<String>,
    pub progress: u8,
    pub status_time: DateTime<Utc>,
    pub page_count: usize,
    pub link_count: usize,
    pub pages_by_status: Vec<(PageStatus, usize)>,
    pub pages_by_distance: BTreeMap<u32, usize>,
    pub problems: Vec<PageProblem>,
}

impl SiteReport {
    pub fn from_site(site: &Site) -> Self {
        let info = &site.info;
        let pages = site
            .contents
            .as_ref()
            .map(|contents| contents.pages.as_slice())
            .unwrap_or_default();

        let status_line = match info.status {
            SiteStatus::Added | SiteStatus::Processing => {
                Some(format!("Processing: {}%", info.progress))
            }
            _ => info.status_description.clone(),
        };

        let pages_by_status = PageStatus::all_statuses()
            .into_iter()
            .map(|status| (status, pages.iter().filter(|p| p.status == status).count()))
            .filter(|(_, count)| *count > 0)
            .collect();

        let mut pages_by_distance = BTreeMap::new();
        for page in pages {
            *pages_by_distance.entry(page.distance_from_root).or_insert(0) += 1;
        }

        let problems = pages
            .iter()
            .filter(|p| p.status == PageStatus::Error)
            .map(|p| PageProblem {
                url: p.url.clone(),
                description: describe_http_status(p.http_status)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
            .collect();

        Self {
            domain: info.domain.clone(),
            status: info.status,
            status_line,
            progress: info.progress,
            status_time: info.status_time,
            page_count: info.page_count,
            link_count: info.link_count,
            pages_by_status,
            pages_by_distance,
            problems,
        }
    }
}

/// Human description of a page's HTTP status
///
/// Returns `None` for statuses below 400, which are not errors.
///
/// # Examples
///
/// ```
/// use site_mapper::output::describe_http_status;
///
/// assert_eq!(describe_http_status(Some(404)).as_deref(), Some("404 Not Found"));
/// assert_eq!(describe_http_status(None).as_deref(), Some("Cannot retrieve the page"));
/// assert_eq!(describe_http_status(Some(200)), None);
/// ```
pub fn describe_http_status(http_status: Option<u16>) -> Option<String> {
    let Some(code) = http_status else {
        return Some("Cannot retrieve the page".to_string());
    };
    if code < 400 {
        return None;
    }

    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason());
    match reason {
        Some(reason) => Some(format!("{} {}", code, reason)),
        None => Some("Unknown error".to_string()),
    }
}

/// Formats a report as plain text
pub fn format_site_report(report: &SiteReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n\n", report.domain));
    out.push_str(&format!("Status: {}\n", report.status));
    if let Some(line) = &report.status_line {
        out.push_str(&format!("  {}\n", line));
    }
    out.push_str(&format!("Progress: {}%\n", report.progress));
    out.push_str(&format!(
        "Updated: {}\n",
        report.status_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Pages: {}\n", report.page_count));
    out.push_str(&format!("Links: {}\n", report.link_count));

    if !report.pages_by_status.is_empty() {
        out.push_str("\nPages by status:\n");
        for (status, count) in &report.pages_by_status {
            out.push_str(&format!("  {}: {}\n", status, count));
        }
    }

    if !report.pages_by_distance.is_empty() {
        out.push_str("\nPages by distance from root:\n");
        for (distance, count) in &report.pages_by_distance {
            out.push_str(&format!("  {}: {}\n", distance, count));
        }
    }

    if !report.problems.is_empty() {
        out.push_str(&format!("\nProblems ({}):\n", report.problems.len()));
        for problem in &report.problems {
            out.push_str(&format!("  {} - {}\n", problem.url, problem.description));
        }
    }

    out
}

/// Prints a report to stdout
pub fn print_site_report(report: &SiteReport) {
    print!("{}", format_site_report(report));
}
