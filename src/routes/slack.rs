use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use super::AppState;
use crate::pipeline::assembler::{SLACK_EMPTY_DIGEST, daily_digest};
use crate::pipeline::{self, EnrichedMessage};

const CHANNELS_ERROR: &str = "Failed to fetch channels.";
const MESSAGES_ERROR: &str = "Failed to fetch messages.";

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(channels))
        .route("/fetch_summarized", get(fetch_summarized))
        .route("/fetch_summarized_daily", get(fetch_summarized_daily))
}

#[derive(Debug, Deserialize)]
struct ChannelQuery {
    channel_id: String,
}

#[derive(Debug, Serialize)]
struct SlackMessageView {
    text: String,
    summary: String,
    sender: String,
}

impl From<EnrichedMessage> for SlackMessageView {
    fn from(enriched: EnrichedMessage) -> Self {
        Self {
            text: enriched.message.text,
            summary: enriched.summary,
            sender: enriched.message.sender,
        }
    }
}

/// GET /slack/channels
async fn channels(State(state): State<AppState>) -> Json<Value> {
    let Some(slack) = &state.slack else {
        error!("SLACK_BOT_TOKEN is not set");
        return Json(json!({"error": CHANNELS_ERROR}));
    };

    match slack.list_channels().await {
        Ok(channels) => {
            info!(count = channels.len(), "Listed Slack channels");
            Json(json!({"channels": channels}))
        }
        Err(e) => {
            error!("Error fetching channels: {e}");
            Json(json!({"error": CHANNELS_ERROR}))
        }
    }
}

/// GET /slack/fetch_summarized?channel_id=
///
/// The latest history page only, each message summarized.
async fn fetch_summarized(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Json<Value> {
    let Some(slack) = &state.slack else {
        error!("SLACK_BOT_TOKEN is not set");
        return Json(json!({"error": MESSAGES_ERROR}));
    };

    let messages = match slack.fetch_page(&query.channel_id).await {
        Ok(messages) => messages,
        Err(e) => {
            error!(channel = %query.channel_id, "Error fetching messages: {e}");
            return Json(json!({"error": MESSAGES_ERROR}));
        }
    };

    let views: Vec<SlackMessageView> = state
        .enricher
        .enrich_all(messages)
        .await
        .into_iter()
        .map(SlackMessageView::from)
        .collect();
    Json(json!({"summarized_slack_messages": views}))
}

/// GET /slack/fetch_summarized_daily?channel_id=
///
/// Full channel history rolled into one summary.
async fn fetch_summarized_daily(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Json<Value> {
    let messages = match &state.slack {
        Some(slack) => pipeline::collect(&slack.for_channel(&query.channel_id)).await,
        None => {
            error!("SLACK_BOT_TOKEN is not set");
            Vec::new()
        }
    };

    let summary = daily_digest(&state.enricher, &messages, SLACK_EMPTY_DIGEST).await;
    Json(json!({"all_summary": summary}))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use mockito::Matcher;
    use secrecy::SecretString;

    use crate::channels::SlackAdapter;
    use crate::config::SlackConfig;
    use crate::pipeline::enricher::tests::StubModel;
    use crate::routes::tests::{get_json, state};

    fn slack(server: &mockito::Server) -> Arc<SlackAdapter> {
        Arc::new(
            SlackAdapter::new(&SlackConfig {
                bot_token: SecretString::from("xoxb-test"),
            })
            .with_api_base(&server.url()),
        )
    }

    #[tokio::test]
    async fn missing_channel_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) =
            get_json(state(&dir, StubModel::new("", "")), "/slack/fetch_summarized").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_slack_reports_errors() {
        let dir = tempfile::tempdir().unwrap();

        let (status, body) = get_json(state(&dir, StubModel::new("", "")), "/slack/channels").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Failed to fetch channels.");

        let (_, body) = get_json(
            state(&dir, StubModel::new("", "")),
            "/slack/fetch_summarized?channel_id=C1",
        )
        .await;
        assert_eq!(body["error"], "Failed to fetch messages.");

        let (_, body) = get_json(
            state(&dir, StubModel::new("", "")),
            "/slack/fetch_summarized_daily?channel_id=C1",
        )
        .await;
        assert_eq!(body["all_summary"], "No Slack messages found in this channel.");
    }

    #[tokio::test]
    async fn summarized_lists_text_summary_and_sender() {
        let mut server = mockito::Server::new_async().await;
        let _history = server
            .mock("GET", "/conversations.history")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({
                    "ok": true,
                    "messages": [
                        {"text": "deploy is done", "user": "U1", "ts": "1700000000.0001"},
                        {"text": "one two three four five six seven eight nine ten eleven", "user": "U1", "ts": "1700000001.0001"}
                    ],
                    "has_more": false
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _user = server
            .mock("GET", "/users.info")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": true, "user": {"real_name": "Grace"}}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir, StubModel::new("counting", ""));
        state.slack = Some(slack(&server));

        let (status, body) = get_json(state, "/slack/fetch_summarized?channel_id=C1").await;

        assert_eq!(status, StatusCode::OK);
        let messages = body["summarized_slack_messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["text"], "deploy is done");
        assert_eq!(messages[0]["summary"], "deploy is done");
        assert_eq!(messages[0]["sender"], "Grace");
        assert_eq!(messages[1]["summary"], "counting");
    }

    #[tokio::test]
    async fn daily_digest_summarizes_sender_lines() {
        let mut server = mockito::Server::new_async().await;
        let _history = server
            .mock("GET", "/conversations.history")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({
                    "ok": true,
                    "messages": [
                        {"text": "standup moved to ten", "ts": "1.0"},
                        {"text": "release notes are drafted and ready", "ts": "2.0"}
                    ],
                    "has_more": false
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let model = StubModel::new("a quiet day", "");
        let mut state = state(&dir, model);
        state.slack = Some(slack(&server));

        let (_, body) = get_json(state, "/slack/fetch_summarized_daily?channel_id=C1").await;

        assert_eq!(body["all_summary"], "a quiet day");
    }

    #[tokio::test]
    async fn channel_list_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/conversations.list")
            .with_body(r#"{"ok": false, "error": "invalid_auth"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir, StubModel::new("", ""));
        state.slack = Some(slack(&server));

        let (status, body) = get_json(state, "/slack/channels").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Failed to fetch channels.");
    }
}
