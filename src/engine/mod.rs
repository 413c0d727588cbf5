//! Multi-site mapping
//!
//! [`MappingEngine`] consumes the processing queue and runs site crawls under
//! a capacity limit. [`MappingClient`] decides when a site must be mapped and
//! feeds the queue.

mod mapping_client;
mod mapping_engine;

pub use mapping_client::{needs_processing, MappingClient};
pub use mapping_engine::{EngineHandle, EngineMetrics, EngineState, MappingEngine};
