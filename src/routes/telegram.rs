use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use super::AppState;
use crate::pipeline::assembler::{TELEGRAM_EMPTY_DIGEST, daily_digest};
use crate::pipeline::{self, Message};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/fetch_all", get(fetch_all))
        .route("/fetch_summarized", get(fetch_summarized))
        .route("/fetch_summarized_daily", get(fetch_summarized_daily))
}

#[derive(Debug, Serialize)]
struct TelegramMessageView {
    message_id: Option<i64>,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    sender: String,
    chat_id: Option<i64>,
    timestamp: DateTime<Utc>,
}

impl TelegramMessageView {
    fn new(message: Message, summary: Option<String>) -> Self {
        let meta = |key: &str| message.metadata.get(key).and_then(Value::as_i64);
        Self {
            message_id: meta("message_id"),
            chat_id: meta("chat_id"),
            text: message.text,
            summary,
            sender: message.sender,
            timestamp: message.timestamp,
        }
    }
}

/// GET /telegram/fetch_all
async fn fetch_all(State(state): State<AppState>) -> Json<Value> {
    let views: Vec<_> = pipeline::collect(state.telegram.as_ref())
        .await
        .into_iter()
        .map(|m| TelegramMessageView::new(m, None))
        .collect();
    Json(json!({"all_telegram_messages": views}))
}

/// GET /telegram/fetch_summarized
async fn fetch_summarized(State(state): State<AppState>) -> Json<Value> {
    let messages = pipeline::collect(state.telegram.as_ref()).await;
    let views: Vec<_> = state
        .enricher
        .enrich_all(messages)
        .await
        .into_iter()
        .map(|e| TelegramMessageView::new(e.message, Some(e.summary)))
        .collect();
    Json(json!({"summarized_telegram_messages": views}))
}

/// GET /telegram/fetch_summarized_daily
async fn fetch_summarized_daily(State(state): State<AppState>) -> Json<Value> {
    let messages = pipeline::collect(state.telegram.as_ref()).await;
    let summary = daily_digest(&state.enricher, &messages, TELEGRAM_EMPTY_DIGEST).await;
    Json(json!({"daily_summary": summary}))
}
