//! Enrichment: summaries, priority labels and reply suggestions.
//!
//! Every operation degrades instead of failing: a model error falls back to
//! the input text (summaries) or a fixed string (replies).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{SummaryBounds, TextModel};
use crate::pipeline::classifier::PriorityClassifier;
use crate::pipeline::types::{EnrichedMessage, Message, Priority};

/// Texts with fewer words than this are returned as-is by `summarize`.
pub const SUMMARY_MIN_WORDS: usize = 10;

/// Literal marker preceding the suggestion in the reply prompt.
pub const REPLY_MARKER: &str = "Quick reply suggestion:";

/// Returned when the generator produced nothing usable.
pub const NO_REPLY_SUGGESTION: &str = "No reply suggestion.";

/// Summary used for mail whose snippet is empty.
pub const NO_SUMMARY: &str = "No Summary Available";

/// Token budget for reply generation.
const REPLY_MAX_NEW_TOKENS: u32 = 30;

/// Mail shorter than this many characters is flagged for follow-up.
const FOLLOW_UP_MAX_CHARS: usize = 30;

/// A mail message with its enrichment.
#[derive(Debug, Clone)]
pub struct EnrichedMail {
    pub enriched: EnrichedMessage,
    pub needs_follow_up: bool,
}

/// Stateless enrichment over an injected text model.
#[derive(Clone)]
pub struct Enricher {
    model: Arc<dyn TextModel>,
    classifier: PriorityClassifier,
}

impl Enricher {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            classifier: PriorityClassifier::default(),
        }
    }

    /// Summarize `text`, passing short texts through unchanged.
    pub async fn summarize(&self, text: &str, bounds: SummaryBounds) -> String {
        if text.split_whitespace().count() < SUMMARY_MIN_WORDS {
            return text.to_string();
        }

        match self.model.summarize(text, bounds).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(model = %self.model.model_name(), "Summarization failed: {e}");
                text.to_string()
            }
        }
    }

    pub fn classify_priority(&self, subject: &str, body: &str) -> Priority {
        self.classifier.classify(subject, body)
    }

    /// Ask the generator for a short reply to `text`.
    pub async fn suggest_reply(&self, text: &str) -> String {
        let prompt = format!("Email: {text}\n{REPLY_MARKER}");
        match self.model.generate(&prompt, REPLY_MAX_NEW_TOKENS).await {
            Ok(generated) => extract_reply(&generated),
            Err(e) => {
                warn!(model = %self.model.model_name(), "Reply generation failed: {e}");
                NO_REPLY_SUGGESTION.to_string()
            }
        }
    }

    /// Summary, priority and reply suggestion for one mail message.
    pub async fn enrich_mail(&self, message: Message) -> EnrichedMail {
        let subject = message.subject.clone().unwrap_or_default();
        let summary = if message.text.is_empty() {
            NO_SUMMARY.to_string()
        } else {
            self.summarize(&message.text, SummaryBounds::MAIL).await
        };
        let priority = self.classify_priority(&subject, &message.text);
        let quick_reply = self.suggest_reply(&message.text).await;
        let needs_follow_up = message.text.chars().count() < FOLLOW_UP_MAX_CHARS;

        debug!(id = %message.id, priority = %priority, "Enriched mail");

        EnrichedMail {
            enriched: EnrichedMessage {
                message,
                summary,
                priority: Some(priority),
                quick_reply: Some(quick_reply),
            },
            needs_follow_up,
        }
    }

    /// Summary only, for chat and messaging-app messages.
    pub async fn enrich_chat(&self, message: Message) -> EnrichedMessage {
        let summary = self.summarize(&message.text, SummaryBounds::DEFAULT).await;
        EnrichedMessage {
            message,
            summary,
            priority: None,
            quick_reply: None,
        }
    }

    /// Enrich a batch of chat messages sequentially, preserving order.
    pub async fn enrich_all(&self, messages: Vec<Message>) -> Vec<EnrichedMessage> {
        let mut enriched = Vec::with_capacity(messages.len());
        for message in messages {
            enriched.push(self.enrich_chat(message).await);
        }
        enriched
    }
}

/// Text after the last reply marker, trimmed; the fallback when empty.
pub fn extract_reply(generated: &str) -> String {
    let tail = generated
        .rsplit(REPLY_MARKER)
        .next()
        .unwrap_or_default()
        .trim();
    if tail.is_empty() {
        NO_REPLY_SUGGESTION.to_string()
    } else {
        tail.to_string()
    }
}
