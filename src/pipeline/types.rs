//! Shared types for the message enrichment pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

// ── Normalized message ──────────────────────────────────────────────

/// Unified message from any platform.
///
/// Adapters convert their native format into this struct. It is never
/// persisted; one pipeline pass consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Platform-native message ID.
    pub id: String,
    /// Source channel: "gmail", "slack", "telegram", "whatsapp".
    pub channel: String,
    /// Human-readable sender (display name, address or phone number).
    pub sender: String,
    /// Subject line (mail only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body. For mail this is the API-provided snippet.
    pub text: String,
    /// When the message was sent. Unparseable timestamps become the Unix epoch.
    pub timestamp: DateTime<Utc>,
    /// Platform-specific extras (Telegram chat id, Slack user id).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl Message {
    pub fn new(
        channel: &str,
        id: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            channel: channel.to_string(),
            sender: sender.into(),
            subject: None,
            text: text.into(),
            timestamp,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// `"sender: text"`, the line format used by digests.
    pub fn digest_line(&self) -> String {
        format!("{}: {}", self.sender, self.text)
    }
}

/// Fallback timestamp for missing or unparseable values.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// ── Priority ────────────────────────────────────────────────────────

/// Keyword-derived priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Urgent")]
    Urgent,
    #[serde(rename = "Mid Priority")]
    MidPriority,
    #[serde(rename = "Low Priority")]
    LowPriority,
}

impl Priority {
    /// Wire label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::MidPriority => "Mid Priority",
            Self::LowPriority => "Low Priority",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Enriched message ────────────────────────────────────────────────

/// A message after one pass through the enrichment pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub summary: String,
    /// Set for mail only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Set for mail only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<String>,
}

// ── Channel adapter trait ───────────────────────────────────────────

/// Trait for platform adapters: pure I/O, no enrichment.
///
/// Adapters authenticate, paginate until exhausted, and normalize every
/// upstream message into [`Message`]. Summaries and priorities are added
/// later by the `Enricher`.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel name (e.g. "gmail", "telegram").
    fn name(&self) -> &str;

    /// Fetch the current batch of messages from this platform.
    async fn fetch_messages(&self) -> Result<Vec<Message>, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_serializes_to_wire_labels() {
        assert_eq!(
            serde_json::to_value(Priority::Urgent).unwrap(),
            serde_json::json!("Urgent")
        );
        assert_eq!(
            serde_json::to_value(Priority::MidPriority).unwrap(),
            serde_json::json!("Mid Priority")
        );
        assert_eq!(
            serde_json::to_value(Priority::LowPriority).unwrap(),
            serde_json::json!("Low Priority")
        );
        assert_eq!(Priority::MidPriority.to_string(), "Mid Priority");
    }

    #[test]
    fn digest_line_joins_sender_and_text() {
        let msg = Message::new("slack", "1", "Alice", "ship it", epoch());
        assert_eq!(msg.digest_line(), "Alice: ship it");
    }

    #[test]
    fn enriched_message_flattens_and_omits_absent_fields() {
        let enriched = EnrichedMessage {
            message: Message::new("telegram", "42", "Bob", "hello", epoch()),
            summary: "hello".into(),
            priority: None,
            quick_reply: None,
        };
        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["id"], "42");
        assert_eq!(json["sender"], "Bob");
        assert_eq!(json["summary"], "hello");
        assert!(json.get("priority").is_none());
        assert!(json.get("quick_reply").is_none());
        assert!(json.get("metadata").is_none());
        assert!(json.get("subject").is_none());
    }

    #[test]
    fn epoch_is_unix_zero() {
        assert_eq!(epoch().timestamp(), 0);
    }
}
