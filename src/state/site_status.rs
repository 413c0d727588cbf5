use std::fmt;

/// Site-level status, driving re-crawl eligibility
///
/// `Added -> Processing -> {Processed, ProcessedWithProblems,
/// ConnectionProblem, RobotsTxtProblem}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SiteStatus {
    /// Queued for crawling, nothing fetched yet
    #[default]
    Added,

    /// Crawl finished without a recorded problem
    Processed,

    /// Crawl finished but the home page could not be used
    ProcessedWithProblems,

    /// Crawl is running
    Processing,

    /// The home page could not be reached
    ConnectionProblem,

    /// robots.txt forbids crawling the home page
    RobotsTxtProblem,
}

impl SiteStatus {
    /// Returns true once the crawl has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Added | Self::Processing)
    }

    /// Returns true for failures that deserve a quick retry
    pub fn is_retryable_problem(&self) -> bool {
        matches!(self, Self::ConnectionProblem | Self::RobotsTxtProblem)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Processed => "processed",
            Self::ProcessedWithProblems => "processed_with_problems",
            Self::Processing => "processing",
            Self::ConnectionProblem => "connection_problem",
            Self::RobotsTxtProblem => "robots_txt_problem",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "added" => Some(Self::Added),
            "processed" => Some(Self::Processed),
            "processed_with_problems" => Some(Self::ProcessedWithProblems),
            "processing" => Some(Self::Processing),
            "connection_problem" => Some(Self::ConnectionProblem),
            "robots_txt_problem" => Some(Self::RobotsTxtProblem),
            _ => None,
        }
    }

    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Added,
            Self::Processed,
            Self::ProcessedWithProblems,
            Self::Processing,
            Self::ConnectionProblem,
            Self::RobotsTxtProblem,
        ]
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
