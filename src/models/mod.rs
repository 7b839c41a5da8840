// src/models/mod.rs

//! Domain models for the flat watcher.

mod config;
mod listing;

// Re-export all public types
pub use config::{
    Config, IdentityConfig, LoggingConfig, NotifyConfig, ScrapeConfig, SelectorConfig,
    StorageConfig,
};
pub use listing::{Listing, RawListing};
