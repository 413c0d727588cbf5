//! Output module for operator-facing reports
//!
//! This module turns stored site snapshots into readable summaries for the
//! command line.

mod report;

pub use report::{
    describe_http_status, format_site_report, print_site_report, PageProblem, SiteReport,
};
