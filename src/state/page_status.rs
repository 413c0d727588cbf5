/// Page status definitions for tracking crawl progress
///
/// A page moves `Unprocessed -> Processing -> {Processed, Error, Binary,
/// UnprocessedBecauseOfRobotsTxt}`. Only the crawler that dispatched a page
/// moves it out of `Processing`.
use std::fmt;

/// Represents the current status of a page within one site crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    /// Page has been discovered and is waiting in the frontier
    Unprocessed,

    /// Page was fetched and its links were collected
    Processed,

    /// Page could not be fetched or returned an HTTP error
    Error,

    /// Page is disallowed by robots.txt
    UnprocessedBecauseOfRobotsTxt,

    /// Page content is not HTML
    Binary,

    /// Page fetch is in flight
    Processing,
}

impl PageStatus {
    /// Returns true if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unprocessed | Self::Processing)
    }

    /// Returns true if pages with this status are part of a saved snapshot
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Processed | Self::Error)
    }

    /// Converts the page status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Processed => "processed",
            Self::Error => "error",
            Self::UnprocessedBecauseOfRobotsTxt => "robots_disallowed",
            Self::Binary => "binary",
            Self::Processing => "processing",
        }
    }

    /// Parses a page status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unprocessed" => Some(Self::Unprocessed),
            "processed" => Some(Self::Processed),
            "error" => Some(Self::Error),
            "robots_disallowed" => Some(Self::UnprocessedBecauseOfRobotsTxt),
            "binary" => Some(Self::Binary),
            "processing" => Some(Self::Processing),
            _ => None,
        }
    }

    /// Returns all possible page statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Unprocessed,
            Self::Processed,
            Self::Error,
            Self::UnprocessedBecauseOfRobotsTxt,
            Self::Binary,
            Self::Processing,
        ]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
