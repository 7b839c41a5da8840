// src/pipeline/ingest.rs

//! Ingestion pipeline.
//!
//! Processes listings strictly one at a time: normalize, conditional
//! insert, announce on insert success. The per-listing sequence is the
//! failure boundary; no listing's error reaches the next one. The
//! sequential discipline is also what makes the store's check-then-
//! insert safe without in-process locking.

use std::sync::Arc;
use std::time::Duration;

use crate::models::{RawListing, ScrapeConfig};
use crate::normalize::Normalizer;
use crate::publish::Publisher;
use crate::storage::{InsertOutcome, ListingStore};

/// Counters for one ingested batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Raw listings processed
    pub processed: usize,
    /// New listings persisted and announced
    pub inserted: usize,
    /// Listings already known to the store
    pub duplicates: usize,
    /// Listings skipped on malformed extraction or storage failure
    pub failures: usize,
}

/// Sequential ingestion pipeline.
pub struct Pipeline {
    normalizer: Normalizer,
    store: Arc<dyn ListingStore>,
    publisher: Publisher,
    listing_delay: Duration,
}

impl Pipeline {
    /// Create a pipeline over injected collaborators.
    pub fn new(
        normalizer: Normalizer,
        store: Arc<dyn ListingStore>,
        publisher: Publisher,
        config: &ScrapeConfig,
    ) -> Self {
        Self {
            normalizer,
            store,
            publisher,
            listing_delay: Duration::from_millis(config.listing_delay_ms),
        }
    }

    /// Ingest a batch of raw listings in source order.
    ///
    /// Announcement order equals scrape order. The pacing delay between
    /// listings respects the site's informal rate tolerance; it is
    /// deliberate backpressure, not an optimization target.
    pub async fn ingest(&self, raws: &[RawListing]) -> IngestStats {
        let mut stats = IngestStats::default();

        for (i, raw) in raws.iter().enumerate() {
            self.ingest_one(raw, &mut stats).await;

            if i + 1 < raws.len() && !self.listing_delay.is_zero() {
                tokio::time::sleep(self.listing_delay).await;
            }
        }

        stats
    }

    async fn ingest_one(&self, raw: &RawListing, stats: &mut IngestStats) {
        stats.processed += 1;

        let listing = match self.normalizer.normalize(raw) {
            Ok(listing) => listing,
            Err(e) => {
                log::warn!("Skipping malformed listing: {e}");
                self.publisher
                    .debug(&format!("Anzeige übersprungen: {e}"))
                    .await;
                stats.failures += 1;
                return;
            }
        };

        match self.store.try_insert(&listing).await {
            Ok(InsertOutcome::Inserted) => {
                stats.inserted += 1;
                // Outcome deliberately ignored: publish failures are
                // the publisher's to report and never block the batch.
                self.publisher.announce(&listing).await;
            }
            Ok(InsertOutcome::AlreadyExists) => {
                log::info!("Known listing, skipping: {}", listing.identity_key);
                stats.duplicates += 1;
            }
            Err(e) => {
                log::error!("Storage failed for \"{}\": {e}", listing.title);
                self.publisher
                    .debug(&format!("Speichern fehlgeschlagen für \"{}\": {e}", listing.title))
                    .await;
                stats.failures += 1;
            }
        }
    }
}
