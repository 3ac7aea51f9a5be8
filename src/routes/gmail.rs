use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::AppState;
use crate::pipeline::{self, PriorityBuckets};

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/process_emails", get(process_emails))
}

/// GET /gmail/process_emails
///
/// Recent mail, enriched one message at a time and split by priority.
async fn process_emails(State(state): State<AppState>) -> Json<PriorityBuckets> {
    let messages = pipeline::collect(state.gmail.as_ref()).await;

    let mut mails = Vec::with_capacity(messages.len());
    for message in messages {
        mails.push(state.enricher.enrich_mail(message).await);
    }

    let buckets = PriorityBuckets::partition(mails);
    info!(
        urgent = buckets.urgent_emails.len(),
        mid = buckets.mid_priority_emails.len(),
        low = buckets.low_priority_emails.len(),
        "Processed emails"
    );
    Json(buckets)
}
