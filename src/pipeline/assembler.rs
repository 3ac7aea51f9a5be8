//! Response assembly: priority buckets and rolled-up digests.

use serde::Serialize;

use crate::llm::SummaryBounds;
use crate::pipeline::enricher::{EnrichedMail, Enricher};
use crate::pipeline::types::{Message, Priority};

/// Digest sentinel for an empty Slack channel.
pub const SLACK_EMPTY_DIGEST: &str = "No Slack messages found in this channel.";

/// Digest sentinel for an empty Telegram poll.
pub const TELEGRAM_EMPTY_DIGEST: &str = "No messages available.";

/// One email as the mail endpoint reports it.
#[derive(Debug, Clone, Serialize)]
pub struct EmailView {
    pub id: String,
    pub subject: String,
    pub summary: String,
    pub priority: Priority,
    pub quick_reply: String,
    pub needs_follow_up: bool,
}

impl From<EnrichedMail> for EmailView {
    fn from(mail: EnrichedMail) -> Self {
        let EnrichedMail {
            enriched,
            needs_follow_up,
        } = mail;
        Self {
            id: enriched.message.id,
            subject: enriched.message.subject.unwrap_or_default(),
            summary: enriched.summary,
            priority: enriched.priority.unwrap_or(Priority::LowPriority),
            quick_reply: enriched.quick_reply.unwrap_or_default(),
            needs_follow_up,
        }
    }
}

/// Mail partitioned into three fixed buckets; fetch order is kept within each.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriorityBuckets {
    pub urgent_emails: Vec<EmailView>,
    pub mid_priority_emails: Vec<EmailView>,
    pub low_priority_emails: Vec<EmailView>,
}

impl PriorityBuckets {
    pub fn partition(mails: impl IntoIterator<Item = EnrichedMail>) -> Self {
        let mut buckets = Self::default();
        for mail in mails {
            let view = EmailView::from(mail);
            match view.priority {
                Priority::Urgent => buckets.urgent_emails.push(view),
                Priority::MidPriority => buckets.mid_priority_emails.push(view),
                Priority::LowPriority => buckets.low_priority_emails.push(view),
            }
        }
        buckets
    }

    pub fn len(&self) -> usize {
        self.urgent_emails.len() + self.mid_priority_emails.len() + self.low_priority_emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All messages as `"sender: text"` lines, one per message.
pub fn digest_text(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::digest_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarize every message at once; `empty_sentinel` when there are none.
pub async fn daily_digest(enricher: &Enricher, messages: &[Message], empty_sentinel: &str) -> String {
    if messages.is_empty() {
        return empty_sentinel.to_string();
    }
    enricher
        .summarize(&digest_text(messages), SummaryBounds::DEFAULT)
        .await
}
