use crate::state::{PageStatus, SiteStatus};
use chrono::{DateTime, Utc};

/// A page discovered during a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Discovery sequence number, the root page is 0
    pub id: usize,
    pub url: String,
    pub title: String,
    /// BFS depth from the root page
    pub distance_from_root: u32,
    pub http_status: Option<u16>,
    pub status: PageStatus,
    /// Ids of linked pages
    pub links_to: Vec<usize>,
}

impl Page {
    pub fn new(id: usize, url: impl Into<String>, distance_from_root: u32) -> Self {
        Self {
            id,
            url: url.into(),
            title: String::new(),
            distance_from_root,
            http_status: None,
            status: PageStatus::Unprocessed,
            links_to: Vec::new(),
        }
    }

    /// Copy of the page without its outgoing links
    pub fn detached(&self) -> Self {
        Self {
            links_to: Vec::new(),
            ..self.clone()
        }
    }
}

/// Site-level metadata, keyed by domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub domain: String,
    /// Percentage in 0..=100
    pub progress: u8,
    pub status: SiteStatus,
    pub status_description: Option<String>,
    /// Time of the last save
    pub status_time: DateTime<Utc>,
    pub page_count: usize,
    pub link_count: usize,
    pub refresh_enabled: bool,
}

impl SiteInfo {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            progress: 0,
            status: SiteStatus::Added,
            status_description: None,
            status_time: Utc::now(),
            page_count: 0,
            link_count: 0,
            refresh_enabled: true,
        }
    }
}

/// Pages of a site snapshot, saved and loaded as a unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteContents {
    pub pages: Vec<Page>,
}

/// A site snapshot
///
/// `contents` is `None` when the pages were not requested or were omitted
/// because the caller's cached copy is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub info: SiteInfo,
    pub contents: Option<SiteContents>,
}

impl Site {
    /// A fresh `Added` placeholder with empty contents
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            info: SiteInfo::new(domain),
            contents: Some(SiteContents::default()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.info.domain
    }
}
