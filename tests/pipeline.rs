// tests/pipeline.rs

//! End-to-end pipeline scenarios with a real in-memory store and fake
//! channel/source collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use flatwatch::error::{AppError, Result};
use flatwatch::models::{Config, Listing, NotifyConfig, RawListing, ScrapeConfig};
use flatwatch::normalize::Normalizer;
use flatwatch::pipeline::{Pipeline, run_cycle};
use flatwatch::publish::{MessageId, NotificationChannel, Publisher};
use flatwatch::source::{ListingSource, SearchPage};
use flatwatch::storage::{InsertOutcome, ListingStore, SqlListingStore};

/// Records every channel call; never fails.
#[derive(Default)]
struct RecordingChannel {
    texts: Mutex<Vec<(String, String)>>,
    pins: Mutex<Vec<MessageId>>,
}

impl RecordingChannel {
    fn announcements(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| chat == "@flats")
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn diagnostics(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| chat == "@flats-debug")
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId> {
        self.texts
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(1)
    }

    async fn send_media_group(
        &self,
        chat_id: &str,
        caption: &str,
        _media_urls: &[String],
    ) -> Result<MessageId> {
        self.texts
            .lock()
            .unwrap()
            .push((chat_id.to_string(), caption.to_string()));
        Ok(2)
    }

    async fn pin_message(&self, _chat_id: &str, message_id: MessageId) -> Result<()> {
        self.pins.lock().unwrap().push(message_id);
        Ok(())
    }

    async fn set_description(&self, _chat_id: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Delegating store that fails for one identity key.
struct FlakyStore {
    inner: SqlListingStore,
    fail_key: String,
}

#[async_trait]
impl ListingStore for FlakyStore {
    async fn exists(&self, identity_key: &str) -> Result<bool> {
        self.inner.exists(identity_key).await
    }

    async fn try_insert(&self, listing: &Listing) -> Result<InsertOutcome> {
        if listing.identity_key == self.fail_key {
            return Err(AppError::storage("connection reset"));
        }
        self.inner.try_insert(listing).await
    }
}

/// Serves canned search results and raw listings.
struct FakeSource {
    raws: Vec<RawListing>,
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn search(&self) -> Result<SearchPage> {
        Ok(SearchPage {
            listing_urls: self.raws.iter().map(|r| r.url.clone()).collect(),
            result_count: Some("135 Ergebnissen".to_string()),
        })
    }

    async fn fetch_listing(&self, url: &str) -> Result<RawListing> {
        self.raws
            .iter()
            .find(|r| r.url == url)
            .cloned()
            .ok_or_else(|| AppError::validation(format!("unknown url {url}")))
    }
}

fn raw_listing(title: &str, labels: &[&str], values: &[&str]) -> RawListing {
    RawListing {
        url: format!("https://example.com/anzeige/{}", title.len()),
        title: title.to_string(),
        views: "7".to_string(),
        date: "01.06.2026".to_string(),
        location: "66111 Saarbrücken".to_string(),
        detail_labels: labels.iter().map(|s| s.to_string()).collect(),
        detail_values: values.iter().map(|s| s.to_string()).collect(),
        checktags: vec!["Balkon".to_string()],
        image_urls: vec![],
        local_image: None,
    }
}

fn notify_config() -> NotifyConfig {
    NotifyConfig {
        channel_id: "@flats".into(),
        debug_channel_id: "@flats-debug".into(),
        ..NotifyConfig::default()
    }
}

fn no_delay() -> ScrapeConfig {
    ScrapeConfig {
        listing_delay_ms: 0,
        media_delay_ms: 0,
        ..ScrapeConfig::default()
    }
}

async fn memory_store() -> SqlListingStore {
    let store = SqlListingStore::connect_in_memory().await.unwrap();
    store.init().await.unwrap();
    store
}

fn pipeline(store: Arc<dyn ListingStore>, channel: Arc<RecordingChannel>) -> Pipeline {
    let publisher = Publisher::new(channel, &notify_config());
    Pipeline::new(
        Normalizer::from_config(&Default::default()),
        store,
        publisher,
        &no_delay(),
    )
}

#[tokio::test]
async fn ingest_is_idempotent_across_runs() {
    let store = Arc::new(memory_store().await);
    let channel = Arc::new(RecordingChannel::default());
    let pipeline = pipeline(store.clone(), channel.clone());

    let raws = vec![raw_listing(
        "Schöne Wohnung",
        &["Zimmer", "Miete"],
        &["2", "650€"],
    )];

    let first = pipeline.ingest(&raws).await;
    assert_eq!(first.inserted, 1);
    assert_eq!(channel.announcements().len(), 1);
    assert!(channel.announcements()[0].contains("Schöne Wohnung"));
    assert!(channel.announcements()[0].contains("Zimmer: 2"));
    assert_eq!(
        store.count("Sch%C3%B6ne%20Wohnung").await.unwrap(),
        1,
        "exactly one row for the encoded title"
    );

    // Second run over identical input: no rows, no announcements.
    let second = pipeline.ingest(&raws).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(channel.announcements().len(), 1);
    assert_eq!(store.count("Sch%C3%B6ne%20Wohnung").await.unwrap(), 1);
}

#[tokio::test]
async fn malformed_listing_never_reaches_store_or_channel() {
    let store = Arc::new(memory_store().await);
    let channel = Arc::new(RecordingChannel::default());
    let pipeline = pipeline(store.clone(), channel.clone());

    // Three labels, two values.
    let raws = vec![raw_listing(
        "Kaputte Anzeige",
        &["Zimmer", "Miete", "Etage"],
        &["2", "650€"],
    )];

    let stats = pipeline.ingest(&raws).await;
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.inserted, 0);
    assert!(channel.announcements().is_empty());
    assert_eq!(channel.diagnostics().len(), 1);
    assert!(channel.diagnostics()[0].contains("3 labels but 2 values"));
    assert_eq!(store.count("Kaputte%20Anzeige").await.unwrap(), 0);
}

#[tokio::test]
async fn storage_failure_skips_listing_but_not_batch() {
    let inner = memory_store().await;
    let channel = Arc::new(RecordingChannel::default());
    let store = Arc::new(FlakyStore {
        inner: inner.clone(),
        fail_key: "Erste%20Wohnung".to_string(),
    });
    let pipeline = pipeline(store, channel.clone());

    let raws = vec![
        raw_listing("Erste Wohnung", &["Zimmer"], &["2"]),
        raw_listing("Zweite Wohnung", &["Zimmer"], &["3"]),
    ];

    let stats = pipeline.ingest(&raws).await;
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.inserted, 1);

    // Nothing written for the failed key, one diagnostic about it.
    assert_eq!(inner.count("Erste%20Wohnung").await.unwrap(), 0);
    assert_eq!(inner.count("Zweite%20Wohnung").await.unwrap(), 1);
    assert!(
        channel
            .diagnostics()
            .iter()
            .any(|d| d.contains("Erste Wohnung") && d.contains("connection reset"))
    );
    // Only the surviving listing was announced.
    assert_eq!(channel.announcements().len(), 1);
    assert!(channel.announcements()[0].contains("Zweite Wohnung"));
}

#[tokio::test]
async fn announcements_preserve_scrape_order() {
    let store = Arc::new(memory_store().await);
    let channel = Arc::new(RecordingChannel::default());
    let pipeline = pipeline(store, channel.clone());

    let raws = vec![
        raw_listing("Aaa", &[], &[]),
        raw_listing("Bbbb", &[], &[]),
        raw_listing("Ccccc", &[], &[]),
    ];

    pipeline.ingest(&raws).await;

    let announced = channel.announcements();
    assert_eq!(announced.len(), 3);
    assert!(announced[0].contains("Aaa"));
    assert!(announced[1].contains("Bbbb"));
    assert!(announced[2].contains("Ccccc"));
}

#[tokio::test]
async fn run_cycle_reports_count_and_ingests() {
    let store = Arc::new(memory_store().await);
    let channel = Arc::new(RecordingChannel::default());
    let publisher = Publisher::new(channel.clone(), &notify_config());
    let pipeline = Pipeline::new(
        Normalizer::from_config(&Default::default()),
        store.clone(),
        publisher.clone(),
        &no_delay(),
    );

    let source = FakeSource {
        raws: vec![
            raw_listing("Schöne Wohnung", &["Zimmer"], &["2"]),
            raw_listing("Noch eine Wohnung", &["Zimmer"], &["3"]),
        ],
    };

    let mut config = Config::default();
    config.scrape = no_delay();
    config.notify = notify_config();

    let stats = run_cycle(&config, &source, &pipeline, &publisher)
        .await
        .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.inserted, 2);
    assert_eq!(channel.announcements().len(), 2);
    assert!(
        channel
            .diagnostics()
            .iter()
            .any(|d| d.contains("135 Ergebnissen"))
    );
    assert!(
        channel
            .diagnostics()
            .iter()
            .any(|d| d.contains("2 Anzeigen"))
    );

    // A second cycle over the same source announces nothing new.
    let stats = run_cycle(&config, &source, &pipeline, &publisher)
        .await
        .unwrap();
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.duplicates, 2);
    assert_eq!(channel.announcements().len(), 2);
}
