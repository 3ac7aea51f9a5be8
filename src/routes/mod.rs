//! HTTP surface: one GET route per platform operation.
//!
//! Handlers never fail with a non-200 because of an upstream problem; they
//! log and degrade to empty results or an `{"error": ...}` body instead.

mod gmail;
mod slack;
mod telegram;
mod whatsapp;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::TokenStore;
use crate::channels::{GmailAdapter, SlackAdapter, TelegramAdapter, WhatsAppAdapter};
use crate::config::AppConfig;
use crate::llm::{TextModel, create_model};
use crate::pipeline::{ChannelAdapter, Enricher};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub enricher: Enricher,
    pub gmail: Arc<dyn ChannelAdapter>,
    /// `None` when no Slack bot token is configured.
    pub slack: Option<Arc<SlackAdapter>>,
    pub telegram: Arc<dyn ChannelAdapter>,
    /// `None` when Twilio credentials are missing.
    pub whatsapp: Option<Arc<dyn ChannelAdapter>>,
    /// The Gmail credential file, removed on logout.
    pub token_store: TokenStore,
}

impl AppState {
    /// Create the configured model backend, then wire every adapter.
    pub fn build(config: &AppConfig) -> crate::error::Result<Self> {
        let model = create_model(&config.model)?;
        Ok(Self::from_config(config, model))
    }

    /// Wire every adapter from configuration.
    pub fn from_config(config: &AppConfig, model: Arc<dyn TextModel>) -> Self {
        let gmail = GmailAdapter::new(&config.gmail);
        let token_store = gmail.authenticator().store().clone();

        let slack = config.slack.as_ref().map(|c| Arc::new(SlackAdapter::new(c)));
        if slack.is_none() {
            warn!("SLACK_BOT_TOKEN not set; Slack routes will return errors");
        }

        let whatsapp = config
            .twilio
            .as_ref()
            .map(|c| Arc::new(WhatsAppAdapter::new(c)) as Arc<dyn ChannelAdapter>);
        if whatsapp.is_none() {
            warn!("Twilio credentials not set; WhatsApp route will return errors");
        }

        Self {
            enricher: Enricher::new(model),
            gmail: Arc::new(gmail),
            slack,
            telegram: Arc::new(TelegramAdapter::new(&config.telegram)),
            whatsapp,
            token_store,
        }
    }
}

/// Build the full router with permissive CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/logout", get(logout))
        .nest("/gmail", gmail::routes())
        .nest("/slack", slack::routes())
        .nest("/telegram", telegram::routes())
        .nest("/whatsapp", whatsapp::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({"message": "AI Communication Assistant API is running!"}))
}

/// GET /logout
///
/// Deletes the stored Gmail credential; the next mail request re-runs consent.
async fn logout(State(state): State<AppState>) -> Json<Value> {
    match state.token_store.delete() {
        Ok(true) => info!("Logged out"),
        Ok(false) => info!("Logout requested with no stored token"),
        Err(e) => warn!("Failed to remove token file: {e}"),
    }
    Json(json!({"message": "Logged out. token.json removed."}))
}
