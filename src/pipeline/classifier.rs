//! Keyword-based priority classifier.
//!
//! Two fixed keyword tiers are matched case-insensitively as plain
//! substrings of the subject or body. The urgent tier is checked first; a
//! single hit anywhere is enough. Nothing matched means low priority.

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::Priority;

/// Keywords that mark a message urgent.
pub const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "important",
    "critical",
    "action required",
    "meeting",
    "deadline",
    "security issue",
    "payment",
    "invoice",
    "response needed",
    "time-sensitive",
    "high priority",
    "emergency",
    "pressing",
    "imperative",
    "alert",
    "crucial",
    "very important",
    "high-priority",
];

/// Keywords that mark a message mid priority.
pub const MID_PRIORITY_KEYWORDS: &[&str] = &[
    "follow-up",
    "reminder",
    "update",
    "pending",
    "action needed",
    "new release",
    "schedule",
    "report",
    "assignment",
    "task",
    "check in",
    "progress",
    "status update",
    "request",
    "friendly reminder",
    "in progress",
    "review",
    "due soon",
    "upcoming",
    "follow up",
];

/// Two-tier keyword classifier with each tier compiled to one regex.
#[derive(Debug, Clone)]
pub struct PriorityClassifier {
    urgent: Option<Regex>,
    mid: Option<Regex>,
}

impl PriorityClassifier {
    /// Build a classifier from custom keyword tiers.
    pub fn with_keywords(urgent: &[&str], mid: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            urgent: keyword_regex(urgent)?,
            mid: keyword_regex(mid)?,
        })
    }

    /// Classify a subject/body pair. Urgent wins over mid; default is low.
    pub fn classify(&self, subject: &str, body: &str) -> Priority {
        let priority = if tier_matches(self.urgent.as_ref(), subject, body) {
            Priority::Urgent
        } else if tier_matches(self.mid.as_ref(), subject, body) {
            Priority::MidPriority
        } else {
            Priority::LowPriority
        };
        debug!(priority = %priority, "Classified message");
        priority
    }
}

impl Default for PriorityClassifier {
    fn default() -> Self {
        Self::with_keywords(URGENT_KEYWORDS, MID_PRIORITY_KEYWORDS)
            .expect("escaped keyword literals always compile")
    }
}

fn tier_matches(tier: Option<&Regex>, subject: &str, body: &str) -> bool {
    tier.is_some_and(|re| re.is_match(subject) || re.is_match(body))
}

/// Case-insensitive alternation of escaped literals. An empty tier is `None`.
fn keyword_regex(keywords: &[&str]) -> Result<Option<Regex>, regex::Error> {
    if keywords.is_empty() {
        return Ok(None);
    }
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{alternation})")).map(Some)
}

/// Classify with the default keyword tiers.
pub fn classify_priority(subject: &str, body: &str) -> Priority {
    PriorityClassifier::default().classify(subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_subject_is_urgent() {
        assert_eq!(
            classify_priority("Urgent: Payment due", "please pay immediately"),
            Priority::Urgent
        );
    }

    #[test]
    fn no_keywords_is_low() {
        assert_eq!(
            classify_priority("Team lunch", "see you at noon"),
            Priority::LowPriority
        );
    }

    #[test]
    fn urgent_takes_precedence_over_mid() {
        let classifier = PriorityClassifier::default();
        assert_eq!(
            classifier.classify("Friendly reminder", "the deadline is tomorrow"),
            Priority::Urgent
        );
        assert_eq!(
            classifier.classify("Status update", "nothing pressing"),
            Priority::Urgent
        );
    }

    #[test]
    fn mid_keyword_in_body_only() {
        assert_eq!(
            classify_priority("Hello", "Could you review my draft?"),
            Priority::MidPriority
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify_priority("ASAP", ""), Priority::Urgent);
        assert_eq!(classify_priority("", "Due Soon"), Priority::MidPriority);
    }

    #[test]
    fn substring_matches_inside_words() {
        // "task" inside "multitasking" counts; there is no word-boundary check.
        assert_eq!(
            classify_priority("", "notes on multitasking"),
            Priority::MidPriority
        );
        // "alert" inside "alerts".
        assert_eq!(classify_priority("Daily alerts", ""), Priority::Urgent);
    }

    #[test]
    fn every_urgent_keyword_wins_alone() {
        let classifier = PriorityClassifier::default();
        for keyword in URGENT_KEYWORDS {
            assert_eq!(
                classifier.classify(keyword, "see you at noon"),
                Priority::Urgent,
                "keyword: {keyword}"
            );
        }
    }

    #[test]
    fn every_mid_keyword_classifies_mid() {
        let classifier = PriorityClassifier::default();
        for keyword in MID_PRIORITY_KEYWORDS {
            assert_eq!(
                classifier.classify("lunch", keyword),
                Priority::MidPriority,
                "keyword: {keyword}"
            );
        }
    }

    #[test]
    fn keyword_punctuation_is_literal() {
        let classifier = PriorityClassifier::with_keywords(&["a.b"], &[]).unwrap();
        assert_eq!(classifier.classify("axb", ""), Priority::LowPriority);
        assert_eq!(classifier.classify("a.b", ""), Priority::Urgent);
    }

    #[test]
    fn empty_tiers_never_match() {
        let classifier = PriorityClassifier::with_keywords(&[], &[]).unwrap();
        assert_eq!(
            classifier.classify("urgent", "deadline"),
            Priority::LowPriority
        );
    }
}
