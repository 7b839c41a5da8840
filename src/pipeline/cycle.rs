// src/pipeline/cycle.rs

//! One full scrape cycle over the configured search target.

use std::time::Duration;

use chrono::Local;
use reqwest::Client;

use crate::error::Result;
use crate::media;
use crate::models::Config;
use crate::pipeline::{IngestStats, Pipeline};
use crate::publish::Publisher;
use crate::source::ListingSource;
use crate::utils::log;

/// Run one scrape cycle: search, extract, ingest.
///
/// A failed search aborts the cycle (the next trigger starts fresh);
/// a failed extraction or capture only skips its listing.
pub async fn run_cycle(
    config: &Config,
    source: &dyn ListingSource,
    pipeline: &Pipeline,
    publisher: &Publisher,
) -> Result<IngestStats> {
    let started = Local::now();
    log::header("Scrape cycle starting");

    let page = source.search().await?;

    if let Some(count) = &page.result_count {
        publisher.debug(&format!("Zurzeit gibt es {count}.")).await;
    }
    publisher
        .debug(&format!(
            "Ich habe {} Anzeigen gefunden.",
            page.listing_urls.len()
        ))
        .await;
    log::info(&format!("Found {} listings", page.listing_urls.len()));

    let listing_delay = Duration::from_millis(config.scrape.listing_delay_ms);
    let media_delay = Duration::from_millis(config.scrape.media_delay_ms);
    let client = if config.storage.capture_images {
        Some(media_client(config)?)
    } else {
        None
    };

    let mut raws = Vec::with_capacity(page.listing_urls.len());
    for (i, url) in page.listing_urls.iter().enumerate() {
        match source.fetch_listing(url).await {
            Ok(mut raw) => {
                if let Some(client) = &client {
                    capture_location_image(client, &mut raw, config, publisher).await;
                    if !media_delay.is_zero() {
                        tokio::time::sleep(media_delay).await;
                    }
                }
                raws.push(raw);
            }
            Err(e) => {
                log::warn(&format!("Extraction failed for {url}: {e}"));
                publisher
                    .debug(&format!("Anzeige nicht lesbar ({url}): {e}"))
                    .await;
            }
        }

        if i + 1 < page.listing_urls.len() && !listing_delay.is_zero() {
            tokio::time::sleep(listing_delay).await;
        }
    }

    let stats = pipeline.ingest(&raws).await;

    publisher
        .set_description(&format!("Stand: {}", started.format("%d.%m.%Y %H:%M")))
        .await;

    log::summary(
        "Scrape cycle",
        &[
            ("Listings", stats.processed.to_string()),
            ("New", stats.inserted.to_string()),
            ("Known", stats.duplicates.to_string()),
            ("Skipped", stats.failures.to_string()),
        ],
    );
    log::success("Scrape cycle complete");

    Ok(stats)
}

fn media_client(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.scrape.user_agent)
        .timeout(Duration::from_secs(config.scrape.timeout_secs))
        .build()?;
    Ok(client)
}

/// Capture the first gallery image as the listing's location image.
///
/// Capture failure leaves the listing without a local image; it still
/// gets ingested and announced.
async fn capture_location_image(
    client: &Client,
    raw: &mut crate::models::RawListing,
    config: &Config,
    publisher: &Publisher,
) {
    let Some(image_url) = raw.image_urls.first() else {
        return;
    };

    let dest = media::capture_path(&config.storage.image_dir, &raw.title);
    match media::download(client, image_url, &dest).await {
        Ok(()) => {
            raw.local_image = Some(dest.to_string_lossy().into_owned());
        }
        Err(e) => {
            log::warn(&format!("Image capture failed for \"{}\": {e}", raw.title));
            publisher
                .debug(&format!("Bild nicht gespeichert für \"{}\": {e}", raw.title))
                .await;
        }
    }
}
