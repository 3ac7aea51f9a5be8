//! WhatsApp adapter backed by the Twilio Messages API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::TwilioConfig;
use crate::error::ChannelError;
use crate::pipeline::types::{ChannelAdapter, Message, epoch};

const CHANNEL: &str = "whatsapp";

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Only the most recent messages are read; there is no pagination.
const PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    messages: Vec<TwilioMessage>,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    date_sent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: String,
}

impl TwilioMessage {
    fn into_message(self) -> Message {
        // RFC 2822, e.g. "Mon, 16 Aug 2010 03:45:01 +0000"
        let timestamp = self
            .date_sent
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(epoch);
        Message::new(
            CHANNEL,
            self.sid,
            self.from.unwrap_or_default(),
            self.body.unwrap_or_default(),
            timestamp,
        )
    }
}

pub struct WhatsAppAdapter {
    account_sid: String,
    auth_token: SecretString,
    client: reqwest::Client,
    api_base: String,
}

impl WhatsAppAdapter {
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppAdapter {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>, ChannelError> {
        let resp = self
            .client
            .get(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .query(&[("PageSize", PAGE_SIZE)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TwilioError>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(ChannelError::api(CHANNEL, reason));
        }

        let page: MessagesPage = resp
            .json()
            .await
            .map_err(|e| ChannelError::invalid(CHANNEL, e.to_string()))?;

        Ok(page
            .messages
            .into_iter()
            .map(TwilioMessage::into_message)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn adapter(server: &mockito::Server) -> WhatsAppAdapter {
        WhatsAppAdapter::new(&TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: SecretString::from("secret"),
        })
        .with_api_base(&server.url())
    }

    #[tokio::test]
    async fn fetches_latest_page_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2010-04-01/Accounts/AC123/Messages.json")
            .match_query(Matcher::UrlEncoded("PageSize".into(), "5".into()))
            // base64("AC123:secret")
            .match_header("authorization", "Basic QUMxMjM6c2VjcmV0")
            .with_body(
                serde_json::json!({
                    "messages": [
                        {
                            "sid": "SM1",
                            "from": "whatsapp:+15550001",
                            "body": "Running late",
                            "date_sent": "Mon, 16 Aug 2010 03:45:01 +0000"
                        },
                        {"sid": "SM2", "from": "whatsapp:+15550002", "body": "ok", "date_sent": null}
                    ],
                    "page_size": 5
                })
                .to_string(),
            )
            .create_async()
            .await;

        let messages = adapter(&server).fetch_messages().await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "SM1");
        assert_eq!(messages[0].sender, "whatsapp:+15550001");
        assert_eq!(messages[0].text, "Running late");
        assert_eq!(messages[0].timestamp.to_rfc3339(), "2010-08-16T03:45:01+00:00");
        assert_eq!(messages[1].timestamp, epoch());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_carries_twilio_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/2010-04-01/Accounts/AC123/Messages.json")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"code": 20003, "message": "Authenticate", "status": 401}"#)
            .create_async()
            .await;

        let err = adapter(&server).fetch_messages().await.unwrap_err();
        assert!(matches!(&err, ChannelError::Api { reason, .. } if reason == "Authenticate"));
    }
}
