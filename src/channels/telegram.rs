//! Telegram adapter: reads pending updates from the Bot API.
//!
//! Each fetch is a single `getUpdates` call; no offset is acknowledged, so
//! Telegram keeps returning the same window until it expires server-side.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::TelegramConfig;
use crate::error::ChannelError;
use crate::pipeline::types::{ChannelAdapter, Message, epoch};

const CHANNEL: &str = "telegram";

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message IDs that are never returned.
///
/// These are fixed IDs in one particular group chat; a different bot or
/// chat will simply never see them.
pub const IGNORED_MESSAGE_IDS: [i64; 2] = [159, 170];

/// Telegram Bot API adapter.
pub struct TelegramAdapter {
    bot_token: Option<SecretString>,
    group_chat_id: Option<i64>,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramAdapter {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            group_chat_id: config.group_chat_id,
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, token: &SecretString, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, token.expose_secret())
    }

    /// Convert one update into a message, or `None` if it should be dropped.
    fn parse_update(&self, update: &Value) -> Option<Message> {
        let message = update.get("message")?;

        let message_id = message.get("message_id").and_then(Value::as_i64);
        if message_id.is_some_and(|id| IGNORED_MESSAGE_IDS.contains(&id)) {
            return None;
        }

        let chat_id = message
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64);
        if let Some(wanted) = self.group_chat_id {
            if chat_id != Some(wanted) {
                return None;
            }
        }

        let text = clean_text(message.get("text").and_then(Value::as_str).unwrap_or(""));
        if text.is_empty() {
            return None;
        }

        let from = message.get("from");
        let name_part = |key: &str| {
            from.and_then(|f| f.get(key))
                .and_then(Value::as_str)
                .unwrap_or("")
        };
        let full_name = format!("{} {}", name_part("first_name"), name_part("last_name"));
        let sender = match full_name.trim() {
            "" => "Unknown".to_string(),
            name => name.to_string(),
        };

        let timestamp = message
            .get("date")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(epoch);

        let id = message_id.map(|id| id.to_string()).unwrap_or_default();
        Some(
            Message::new(CHANNEL, id, sender, text, timestamp).with_metadata(serde_json::json!({
                "message_id": message_id,
                "chat_id": chat_id,
            })),
        )
    }
}

/// Trim, then flatten line breaks to spaces.
fn clean_text(raw: &str) -> String {
    raw.trim().replace(['\n', '\r'], " ")
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>, ChannelError> {
        let Some(token) = &self.bot_token else {
            tracing::error!("TELEGRAM_BOT_TOKEN is not set.");
            return Ok(Vec::new());
        };

        let resp = self
            .client
            .get(self.api_url(token, "getUpdates"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let data: Value = resp
            .json()
            .await
            .map_err(|e| ChannelError::invalid(CHANNEL, e.to_string()))?;

        if data.get("ok").and_then(Value::as_bool) == Some(false) {
            let reason = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("getUpdates failed");
            return Err(ChannelError::api(CHANNEL, reason));
        }

        let messages: Vec<Message> = data
            .get("result")
            .and_then(Value::as_array)
            .map(|updates| updates.iter().filter_map(|u| self.parse_update(u)).collect())
            .unwrap_or_default();

        tracing::debug!(count = messages.len(), "Parsed Telegram updates");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(config: TelegramConfig) -> TelegramAdapter {
        TelegramAdapter::new(&config)
    }

    fn configured() -> TelegramConfig {
        TelegramConfig {
            bot_token: Some(SecretString::from("123:ABC")),
            group_chat_id: None,
        }
    }

    fn update(message_id: i64, chat_id: i64, text: &str) -> Value {
        serde_json::json!({
            "update_id": 1000 + message_id,
            "message": {
                "message_id": message_id,
                "chat": {"id": chat_id},
                "from": {"first_name": "Ada", "last_name": "Lovelace"},
                "date": 1_700_000_000,
                "text": text
            }
        })
    }

    #[test]
    fn api_url_embeds_token() {
        let ch = adapter(configured());
        let token = SecretString::from("123:ABC");
        assert_eq!(
            ch.api_url(&token, "getUpdates"),
            "https://api.telegram.org/bot123:ABC/getUpdates"
        );
    }

    #[test]
    fn ignored_ids_are_dropped() {
        let ch = adapter(configured());
        for id in IGNORED_MESSAGE_IDS {
            assert!(ch.parse_update(&update(id, 1, "hello")).is_none());
        }
        assert!(ch.parse_update(&update(160, 1, "hello")).is_some());
    }

    #[test]
    fn text_is_trimmed_and_flattened() {
        assert_eq!(clean_text("  line one\nline two\r\n "), "line one line two");
        assert_eq!(clean_text("a\r\nb"), "a  b");
        let ch = adapter(configured());
        let msg = ch.parse_update(&update(1, 1, " a\nb ")).unwrap();
        assert_eq!(msg.text, "a b");
    }

    #[test]
    fn blank_text_and_non_message_updates_are_skipped() {
        let ch = adapter(configured());
        assert!(ch.parse_update(&update(1, 1, "  \n ")).is_none());
        assert!(ch.parse_update(&serde_json::json!({"update_id": 5, "edited_message": {}})).is_none());

        let mut photo = update(2, 1, "");
        photo["message"].as_object_mut().unwrap().remove("text");
        assert!(ch.parse_update(&photo).is_none());
    }

    #[test]
    fn sender_falls_back_to_unknown() {
        let ch = adapter(configured());

        let msg = ch.parse_update(&update(1, 1, "hi")).unwrap();
        assert_eq!(msg.sender, "Ada Lovelace");

        let mut first_only = update(2, 1, "hi");
        first_only["message"]["from"] = serde_json::json!({"first_name": "Ada"});
        assert_eq!(ch.parse_update(&first_only).unwrap().sender, "Ada");

        let mut anonymous = update(3, 1, "hi");
        anonymous["message"].as_object_mut().unwrap().remove("from");
        assert_eq!(ch.parse_update(&anonymous).unwrap().sender, "Unknown");
    }

    #[test]
    fn metadata_and_timestamp() {
        let ch = adapter(configured());
        let msg = ch.parse_update(&update(7, -100_123, "hi")).unwrap();
        assert_eq!(msg.id, "7");
        assert_eq!(msg.metadata["chat_id"], -100_123);
        assert_eq!(msg.metadata["message_id"], 7);
        assert_eq!(msg.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn group_chat_filter() {
        let ch = adapter(TelegramConfig {
            group_chat_id: Some(42),
            ..configured()
        });
        assert!(ch.parse_update(&update(1, 42, "in")).is_some());
        assert!(ch.parse_update(&update(2, 43, "out")).is_none());
    }

    #[tokio::test]
    async fn missing_token_returns_empty_without_calling_api() {
        let mut server = mockito::Server::new_async().await;
        let never = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let ch = adapter(TelegramConfig::default()).with_api_base(&server.url());
        let messages = ch.fetch_messages().await.unwrap();

        assert!(messages.is_empty());
        never.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_filters_updates_in_order() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "ok": true,
            "result": [
                update(158, 1, "first"),
                update(159, 1, "ignored"),
                update(170, 1, "ignored too"),
                update(171, 1, "second"),
            ]
        });
        let _mock = server
            .mock("GET", "/bot123:ABC/getUpdates")
            .with_body(body.to_string())
            .create_async()
            .await;

        let ch = adapter(configured()).with_api_base(&server.url());
        let messages = ch.fetch_messages().await.unwrap();

        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(messages.iter().all(|m| m.id != "159" && m.id != "170"));
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/bot123:ABC/getUpdates")
            .with_status(401)
            .with_body(r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#)
            .create_async()
            .await;

        let ch = adapter(configured()).with_api_base(&server.url());
        let err = ch.fetch_messages().await.unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }
}
