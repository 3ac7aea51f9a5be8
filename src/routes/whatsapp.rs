use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use super::AppState;
use crate::error::ChannelError;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/fetch_summarized", get(fetch_summarized))
}

#[derive(Debug, Serialize)]
struct WhatsAppMessageView {
    text: String,
    summary: String,
}

/// GET /whatsapp/fetch_summarized
///
/// Failures are reported inside the same key as the message list.
async fn fetch_summarized(State(state): State<AppState>) -> Json<Value> {
    let Some(whatsapp) = &state.whatsapp else {
        let err = ChannelError::NotConfigured {
            name: "whatsapp".into(),
            reason: "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN are required".into(),
        };
        error!("{err}");
        return Json(json!({"summarized_whatsapp_messages": {"error": err.to_string()}}));
    };

    let messages = match whatsapp.fetch_messages().await {
        Ok(messages) => messages,
        Err(e) => {
            error!("Error fetching WhatsApp messages: {e}");
            return Json(json!({"summarized_whatsapp_messages": {"error": e.to_string()}}));
        }
    };

    let views: Vec<_> = state
        .enricher
        .enrich_all(messages)
        .await
        .into_iter()
        .map(|e| WhatsAppMessageView {
            text: e.message.text,
            summary: e.summary,
        })
        .collect();
    Json(json!({"summarized_whatsapp_messages": views}))
}
