//! Site data model and the in-memory page graph of a crawl
//!
//! - [`Site`]: a persisted snapshot (`SiteInfo` plus optional `SiteContents`)
//! - [`PageGraph`]: the working set of one crawl session
//! - [`build_contents`]: deterministic rebuild of a snapshot from the working set

mod graph;
mod models;
mod snapshot;

pub use graph::PageGraph;
pub use models::{Page, Site, SiteContents, SiteInfo};
pub use snapshot::build_contents;
