//! Status lifecycles for pages and sites
//!
//! - `PageStatus`: where a single page is in its fetch lifecycle
//! - `SiteStatus`: the outcome of a whole site crawl

mod page_status;
mod site_status;

pub use page_status::PageStatus;
pub use site_status::SiteStatus;
