//! Storage abstractions for listing persistence.
//!
//! The only consistency invariant the store enforces is uniqueness of
//! the identity key: one row per key, inserted at most once, never
//! updated or deleted.

pub mod sql;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Listing;

// Re-export for convenience
pub use sql::SqlListingStore;

/// Outcome of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The listing was new and has been persisted.
    Inserted,
    /// A row with the same identity key already existed; nothing was
    /// written.
    AlreadyExists,
}

/// Trait for listing storage backends.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Check whether a listing with this identity key is already stored.
    async fn exists(&self, identity_key: &str) -> Result<bool>;

    /// Insert the listing if and only if its identity key is absent.
    ///
    /// A uniqueness-constraint violation raced in by another writer is
    /// reported as [`InsertOutcome::AlreadyExists`], never as an error.
    async fn try_insert(&self, listing: &Listing) -> Result<InsertOutcome>;
}
