//! Notification publisher.
//!
//! Best-effort announcement of newly stored listings. Nothing in this
//! module propagates an error past its own boundary; every channel
//! failure ends up on the diagnostic channel or in the log.

pub mod channel;

use std::sync::Arc;

use crate::models::{Listing, NotifyConfig};

// Re-export for convenience
pub use channel::{BotApiChannel, MEDIA_GROUP_LIMIT, MessageId, NotificationChannel};

/// Publishes announcements to the primary channel and diagnostics to
/// the debug channel.
#[derive(Clone)]
pub struct Publisher {
    channel: Arc<dyn NotificationChannel>,
    channel_id: String,
    debug_channel_id: String,
    template: String,
}

impl Publisher {
    /// Create a publisher over a channel capability.
    pub fn new(channel: Arc<dyn NotificationChannel>, config: &NotifyConfig) -> Self {
        Self {
            channel,
            channel_id: config.channel_id.clone(),
            debug_channel_id: config.debug_channel_id.clone(),
            template: config.template.clone(),
        }
    }

    /// Send an operator-facing message to the diagnostic channel.
    ///
    /// Failures are logged and swallowed; diagnostics must never take
    /// the pipeline down.
    pub async fn debug(&self, message: &str) {
        if let Err(e) = self
            .channel
            .send_text(&self.debug_channel_id, message)
            .await
        {
            log::warn!("Diagnostic message not delivered: {e}");
        }
    }

    /// Update the announcement channel description.
    pub async fn set_description(&self, text: &str) {
        if let Err(e) = self.channel.set_description(&self.channel_id, text).await {
            log::warn!("Channel description not updated: {e}");
        }
    }

    /// Announce a newly stored listing.
    ///
    /// Sequence: diagnostic dump, then the announcement (grouped media
    /// with the text as caption when images exist, plain text
    /// otherwise), then pin the delivered message. Media failure falls
    /// back to plain text; pin failure is only reported.
    pub async fn announce(&self, listing: &Listing) {
        self.debug("Neue Wohnung:").await;
        if let Ok(dump) = serde_json::to_string(listing) {
            self.debug(&dump).await;
        }

        let text = listing.format(&self.template);

        let delivered = if listing.images.is_empty() {
            self.channel.send_text(&self.channel_id, &text).await
        } else {
            let batch = &listing.images[..listing.images.len().min(MEDIA_GROUP_LIMIT)];
            match self
                .channel
                .send_media_group(&self.channel_id, &text, batch)
                .await
            {
                Ok(id) => Ok(id),
                Err(e) => {
                    self.debug(&format!(
                        "Media send failed for \"{}\", falling back to text: {e}",
                        listing.title
                    ))
                    .await;
                    self.channel.send_text(&self.channel_id, &text).await
                }
            }
        };

        match delivered {
            Ok(message_id) => {
                if let Err(e) = self.channel.pin_message(&self.channel_id, message_id).await {
                    self.debug(&format!("Pin failed for \"{}\": {e}", listing.title))
                        .await;
                }
            }
            Err(e) => {
                self.debug(&format!(
                    "Announcement failed for \"{}\": {e}",
                    listing.title
                ))
                .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};

    /// Records channel calls; optionally fails media sends.
    #[derive(Default)]
    struct RecordingChannel {
        calls: Mutex<Vec<(String, String)>>,
        media_sizes: Mutex<Vec<usize>>,
        pins: Mutex<Vec<MessageId>>,
        fail_media: bool,
        fail_text: bool,
    }

    impl RecordingChannel {
        fn texts_to(&self, chat: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == chat)
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId> {
            if self.fail_text && chat_id == "@flats" {
                return Err(AppError::notify("text rejected"));
            }
            self.calls
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            Ok(1)
        }

        async fn send_media_group(
            &self,
            chat_id: &str,
            caption: &str,
            media_urls: &[String],
        ) -> Result<MessageId> {
            if self.fail_media {
                return Err(AppError::notify("media rejected"));
            }
            self.media_sizes.lock().unwrap().push(media_urls.len());
            self.calls
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

    fn config() -> NotifyConfig {
        NotifyConfig {
            channel_id: "@flats".into(),
            debug_channel_id: "@flats-debug".into(),
            ..NotifyConfig::default()
        }
    }

    fn listing(images: usize) -> Listing {
        Listing {
            identity_key: "key".into(),
            title: "Schöne Wohnung".into(),
            views: "5".into(),
            location: "Saarbrücken".into(),
            date: "01.06.2026".into(),
            checktags: vec![],
            properties: vec![],
            has_location_img: false,
            images: (0..images)
                .map(|i| format!("https://example.com/{i}.jpg"))
                .collect(),
            local_path: String::new(),
            url: "https://example.com/anzeige/1".into(),
        }
    }

    #[tokio::test]
    async fn test_announce_text_only_pins_message() {
        let channel = Arc::new(RecordingChannel::default());
        let publisher = Publisher::new(channel.clone(), &config());

        publisher.announce(&listing(0)).await;

        let announcements = channel.texts_to("@flats");
        assert_eq!(announcements.len(), 1);
        assert!(announcements[0].contains("Schöne Wohnung"));
        assert_eq!(*channel.pins.lock().unwrap(), vec![1]);
        // Diagnostic dump precedes the announcement.
        assert!(channel.texts_to("@flats-debug").len() >= 2);
    }

    #[tokio::test]
    async fn test_announce_caps_media_group_at_nine() {
        let channel = Arc::new(RecordingChannel::default());
        let publisher = Publisher::new(channel.clone(), &config());

        publisher.announce(&listing(10)).await;

        assert_eq!(*channel.media_sizes.lock().unwrap(), vec![9]);
        assert_eq!(*channel.pins.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_announce_falls_back_to_text_on_media_failure() {
        let channel = Arc::new(RecordingChannel {
            fail_media: true,
            ..RecordingChannel::default()
        });
        let publisher = Publisher::new(channel.clone(), &config());

        publisher.announce(&listing(3)).await;

        // No media delivered, one text fallback, still pinned.
        assert!(channel.media_sizes.lock().unwrap().is_empty());
        assert_eq!(channel.texts_to("@flats").len(), 1);
        assert_eq!(*channel.pins.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_announce_swallows_total_failure() {
        let channel = Arc::new(RecordingChannel {
            fail_media: true,
            fail_text: true,
            ..RecordingChannel::default()
        });
        let publisher = Publisher::new(channel.clone(), &config());

        // Must not panic or propagate; failure lands on the debug channel.
        publisher.announce(&listing(1)).await;
        assert!(channel.pins.lock().unwrap().is_empty());
        assert!(
            channel
                .texts_to("@flats-debug")
                .iter()
                .any(|t| t.contains("failed"))
        );
    }
}
