//! Message enrichment pipeline.
//!
//! Every platform flows one way through:
//! 1. `ChannelAdapter::fetch_messages()`: platform I/O and normalization
//! 2. `Enricher`: summaries, and for mail a priority and reply suggestion
//! 3. `assembler`: priority buckets, flat lists or a single digest

pub mod assembler;
pub mod classifier;
pub mod enricher;
pub mod types;

pub use assembler::{PriorityBuckets, daily_digest};
pub use classifier::{PriorityClassifier, classify_priority};
pub use enricher::{EnrichedMail, Enricher};
pub use types::{ChannelAdapter, EnrichedMessage, Message, Priority};

use tracing::{error, info};

/// Fetch from an adapter, degrading any failure to an empty batch.
pub async fn collect(adapter: &dyn ChannelAdapter) -> Vec<Message> {
    match adapter.fetch_messages().await {
        Ok(messages) => {
            info!(channel = adapter.name(), count = messages.len(), "Fetched messages");
            messages
        }
        Err(e) => {
            error!(channel = adapter.name(), "Fetch failed: {e}");
            Vec::new()
        }
    }
}
