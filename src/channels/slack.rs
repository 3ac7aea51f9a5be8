//! Slack adapter: reads channel history through the Web API.
//!
//! Slack answers HTTP 200 with `{"ok": false, "error": ...}` on API errors,
//! so every response is checked for `ok` before use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::SlackConfig;
use crate::error::ChannelError;
use crate::pipeline::types::{ChannelAdapter, Message, epoch};

const CHANNEL: &str = "slack";

/// Slack returns at most 200 messages per history call.
const HISTORY_PAGE_LIMIT: u32 = 200;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Sender name when the user is absent or cannot be resolved.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// A conversation the bot can see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackChannelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    channels: Vec<SlackChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    text: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    real_name: Option<String>,
}

impl HistoryResponse {
    fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()?
            .next_cursor
            .as_deref()
            .filter(|c| !c.is_empty())
    }
}

/// `ts` is seconds with a fractional part (`"1700000000.000200"`).
fn parse_ts(ts: Option<&str>) -> DateTime<Utc> {
    ts.and_then(|s| s.parse::<f64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp_micros((secs * 1_000_000.0) as i64))
        .unwrap_or_else(epoch)
}

/// Slack Web API client bound to one bot token.
pub struct SlackAdapter {
    client: reqwest::Client,
    bot_token: SecretString,
    api_base: String,
}

impl SlackAdapter {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: config.bot_token.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// View of one channel as a [`ChannelAdapter`].
    pub fn for_channel<'a>(&'a self, channel_id: &str) -> SlackChannel<'a> {
        SlackChannel {
            adapter: self,
            channel_id: channel_id.to_string(),
        }
    }

    /// Call a Web API method and check the `ok` envelope.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ChannelError> {
        let resp = self
            .client
            .get(format!("{}/{method}", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChannelError::api(CHANNEL, format!("{method}: HTTP {status}")));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChannelError::invalid(CHANNEL, e.to_string()))?;
        let envelope: ApiEnvelope = serde_json::from_value(body.clone())
            .map_err(|e| ChannelError::invalid(CHANNEL, e.to_string()))?;
        if !envelope.ok {
            let reason = envelope.error.unwrap_or_else(|| "unknown_error".into());
            return Err(ChannelError::api(CHANNEL, format!("{method}: {reason}")));
        }

        serde_json::from_value(body).map_err(|e| ChannelError::invalid(CHANNEL, e.to_string()))
    }

    pub async fn list_channels(&self) -> Result<Vec<SlackChannelInfo>, ChannelError> {
        let resp: ChannelsResponse = self.call("conversations.list", &[]).await?;
        Ok(resp.channels)
    }

    async fn history_page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<HistoryResponse, ChannelError> {
        let mut params = vec![
            ("channel", channel_id.to_string()),
            ("limit", HISTORY_PAGE_LIMIT.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        self.call("conversations.history", &params).await
    }

    /// The most recent history page only.
    pub async fn fetch_page(&self, channel_id: &str) -> Result<Vec<Message>, ChannelError> {
        let page = self.history_page(channel_id, None).await?;
        Ok(self.normalize(page.messages).await)
    }

    /// Every history page, following the cursor while `has_more` is set.
    ///
    /// An error on any page stops pagination; earlier pages are kept.
    pub async fn fetch_history(&self, channel_id: &str) -> Vec<Message> {
        let mut raw = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0;

        loop {
            page_count += 1;
            let page = match self.history_page(channel_id, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    error!(page = page_count, channel = %channel_id, "Slack history failed: {e}");
                    break;
                }
            };
            debug!(page = page_count, count = page.messages.len(), "Fetched Slack page");

            let next = if page.has_more {
                page.next_cursor().map(str::to_string)
            } else {
                None
            };
            raw.extend(page.messages);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(channel = %channel_id, pages = page_count, count = raw.len(), "Fetched Slack history");
        self.normalize(raw).await
    }

    /// Resolve senders (one lookup per distinct user) and parse timestamps.
    async fn normalize(&self, raw: Vec<HistoryMessage>) -> Vec<Message> {
        let mut names: HashMap<String, String> = HashMap::new();
        let mut messages = Vec::with_capacity(raw.len());

        for msg in raw {
            let sender = match &msg.user {
                Some(user_id) => {
                    if !names.contains_key(user_id) {
                        let name = self.resolve_user(user_id).await;
                        names.insert(user_id.clone(), name);
                    }
                    names[user_id].clone()
                }
                None => UNKNOWN_SENDER.to_string(),
            };

            let timestamp = parse_ts(msg.ts.as_deref());
            let id = msg.ts.unwrap_or_default();
            let metadata = serde_json::json!({ "user": msg.user });
            messages.push(Message::new(CHANNEL, id, sender, msg.text, timestamp).with_metadata(metadata));
        }

        messages
    }

    async fn resolve_user(&self, user_id: &str) -> String {
        match self
            .call::<UserInfoResponse>("users.info", &[("user", user_id.to_string())])
            .await
        {
            Ok(info) => info
                .user
                .real_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            Err(e) => {
                warn!(user = %user_id, "Slack user lookup failed: {e}");
                UNKNOWN_SENDER.to_string()
            }
        }
    }
}

/// One Slack channel, fetched with full pagination.
pub struct SlackChannel<'a> {
    adapter: &'a SlackAdapter,
    channel_id: String,
}

#[async_trait]
impl ChannelAdapter for SlackChannel<'_> {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>, ChannelError> {
        Ok(self.adapter.fetch_history(&self.channel_id).await)
    }
}
