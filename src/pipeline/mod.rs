//! Pipeline entry points for scrape operations.
//!
//! - [`Pipeline::ingest`]: normalize, deduplicate and announce a batch
//!   of raw listings
//! - [`run_cycle`]: one full pass over the configured search target

pub mod cycle;
pub mod ingest;

pub use cycle::run_cycle;
pub use ingest::{IngestStats, Pipeline};
