//! Gmail adapter: lists recent messages via the REST API.
//!
//! Pages through `users/me/messages` with the configured recency query,
//! then fetches each message's metadata for the subject, sender and snippet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::GmailAuthenticator;
use crate::config::GmailConfig;
use crate::error::ChannelError;
use crate::pipeline::types::{ChannelAdapter, Message, epoch};

const CHANNEL: &str = "gmail";

/// Gmail caps `maxResults` at 500.
const PAGE_SIZE: u32 = 100;

const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    internal_date: Option<String>,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl GmailMessage {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn into_message(self) -> Message {
        let subject = self.header("subject").unwrap_or("No Subject").to_string();
        let sender = self.header("from").unwrap_or("Unknown").to_string();
        let timestamp = parse_internal_date(self.internal_date.as_deref());
        Message::new(CHANNEL, self.id, sender, self.snippet, timestamp).with_subject(subject)
    }
}

/// `internalDate` is epoch milliseconds as a string.
fn parse_internal_date(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(epoch)
}

/// Gmail adapter.
pub struct GmailAdapter {
    auth: GmailAuthenticator,
    client: reqwest::Client,
    api_base: String,
    query: String,
}

impl GmailAdapter {
    pub fn new(config: &GmailConfig) -> Self {
        Self {
            auth: GmailAuthenticator::new(config),
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            query: config.query.clone(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn authenticator(&self) -> &GmailAuthenticator {
        &self.auth
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.api_base)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ChannelError> {
        let resp = request.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ChannelError::AuthFailed {
                name: CHANNEL.into(),
                reason: status.to_string(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::api(CHANNEL, format!("{status}: {body}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| ChannelError::invalid(CHANNEL, e.to_string()))
    }

    /// All message IDs matching the query, following `nextPageToken`.
    async fn list_ids(&self, access_token: &str) -> Result<Vec<String>, ChannelError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.messages_url())
                .bearer_auth(access_token)
                .query(&[("q", self.query.as_str())])
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListResponse = self.get_json(request).await?;
            if page.messages.is_empty() {
                break;
            }
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }

    async fn get_message(&self, access_token: &str, id: &str) -> Result<Message, ChannelError> {
        let request = self
            .client
            .get(format!("{}/{id}", self.messages_url()))
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
            ]);
        let message: GmailMessage = self.get_json(request).await?;
        Ok(message.into_message())
    }
}

#[async_trait]
impl ChannelAdapter for GmailAdapter {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>, ChannelError> {
        let token = self.auth.credentials(false).await?;
        let access_token = token.access_token();

        let ids = self.list_ids(access_token).await?;
        info!(count = ids.len(), query = %self.query, "Listed Gmail messages");

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get_message(access_token, id).await {
                Ok(message) => messages.push(message),
                Err(e) => warn!(id = %id, "Skipping Gmail message: {e}"),
            }
        }
        Ok(messages)
    }
}
