//! Notification channel capability.
//!
//! The publisher only depends on the four operations below; the Bot
//! API implementation is one provider of them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};

/// Provider-side cap on grouped media messages.
pub const MEDIA_GROUP_LIMIT: usize = 9;

/// Identifier of a delivered message, used for pinning.
pub type MessageId = i64;

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId>;

    /// Send up to [`MEDIA_GROUP_LIMIT`] images as one grouped message,
    /// captioned with the given text.
    async fn send_media_group(
        &self,
        chat_id: &str,
        caption: &str,
        media_urls: &[String],
    ) -> Result<MessageId>;

    /// Pin a previously delivered message.
    async fn pin_message(&self, chat_id: &str, message_id: MessageId) -> Result<()>;

    /// Set the channel description.
    async fn set_description(&self, chat_id: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram-style Bot HTTP API channel.
pub struct BotApiChannel {
    client: Client,
    base: String,
}

impl BotApiChannel {
    /// Create a channel client for the given API base and bot token.
    pub fn new(api_base: &str, bot_token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
        })
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base, method);
        let response: ApiResponse = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            let reason = response
                .description
                .unwrap_or_else(|| "no description".to_string());
            return Err(AppError::notify(format!("{method} failed: {reason}")));
        }
        Ok(response.result)
    }

    fn message_id(result: &Value, method: &str) -> Result<MessageId> {
        // sendMediaGroup returns an array of messages; take the first.
        let message = match result {
            Value::Array(messages) => messages.first(),
            other => Some(other),
        };
        message
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::notify(format!("{method} returned no message_id")))
    }
}

#[async_trait]
impl NotificationChannel for BotApiChannel {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageId> {
        let result = self
            .call(
                "sendMessage",
                &json!({ "chat_id": chat_id, "text": text }),
            )
            .await?;
        Self::message_id(&result, "sendMessage")
    }

    async fn send_media_group(
        &self,
        chat_id: &str,
        caption: &str,
        media_urls: &[String],
    ) -> Result<MessageId> {
        let media: Vec<Value> = media_urls
            .iter()
            .take(MEDIA_GROUP_LIMIT)
            .enumerate()
            .map(|(i, url)| {
                if i == 0 {
                    json!({ "type": "photo", "media": url, "caption": caption })
                } else {
                    json!({ "type": "photo", "media": url })
                }
            })
            .collect();

        let result = self
            .call(
                "sendMediaGroup",
                &json!({ "chat_id": chat_id, "media": media }),
            )
            .await?;
        Self::message_id(&result, "sendMediaGroup")
    }

    async fn pin_message(&self, chat_id: &str, message_id: MessageId) -> Result<()> {
        self.call(
            "pinChatMessage",
            &json!({ "chat_id": chat_id, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    async fn set_description(&self, chat_id: &str, text: &str) -> Result<()> {
        self.call(
            "setChatDescription",
            &json!({ "chat_id": chat_id, "description": text }),
        )
        .await?;
        Ok(())
    }
}
