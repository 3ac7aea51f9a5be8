//! Hugging Face Inference API client.
//!
//! `POST {base}/models/{model}` with `{"inputs": ..., "parameters": {...}}`.
//! Summarization answers `[{"summary_text": ...}]`; text generation answers
//! `[{"generated_text": ...}]`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{SummaryBounds, TextModel};
use crate::error::ModelError;

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    generated_text: String,
}

/// Inference API client for a summarization model and a generation model.
pub struct HuggingFaceModel {
    client: reqwest::Client,
    api_base: String,
    api_token: Option<SecretString>,
    summary_model: String,
    reply_model: String,
}

impl HuggingFaceModel {
    pub fn new(
        api_base: &str,
        api_token: Option<SecretString>,
        summary_model: &str,
        reply_model: &str,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_token,
            summary_model: summary_model.to_string(),
            reply_model: reply_model.to_string(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{model}", self.api_base)
    }

    async fn infer<T>(&self, model: &str, body: serde_json::Value) -> Result<Vec<T>, ModelError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut request = self.client.post(self.model_url(model)).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ModelError::RequestFailed {
                model: model.to_string(),
                reason: format!("{status}: {err}"),
            });
        }

        resp.json::<Vec<T>>()
            .await
            .map_err(|e| ModelError::InvalidResponse {
                model: model.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl TextModel for HuggingFaceModel {
    fn model_name(&self) -> &str {
        &self.summary_model
    }

    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, ModelError> {
        let body = json!({
            "inputs": text,
            "parameters": {
                "min_length": bounds.min_length,
                "max_length": bounds.max_length,
                "do_sample": false,
            },
            "options": { "wait_for_model": true },
        });

        let outputs: Vec<SummaryOutput> = self.infer(&self.summary_model, body).await?;
        debug!(model = %self.summary_model, "Summary received");
        outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text)
            .ok_or_else(|| ModelError::InvalidResponse {
                model: self.summary_model.clone(),
                reason: "empty summary list".into(),
            })
    }

    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, ModelError> {
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": max_new_tokens,
                "num_return_sequences": 1,
                "return_full_text": true,
            },
            "options": { "wait_for_model": true },
        });

        let outputs: Vec<GenerationOutput> = self.infer(&self.reply_model, body).await?;
        debug!(model = %self.reply_model, "Generation received");
        outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or_else(|| ModelError::InvalidResponse {
                model: self.reply_model.clone(),
                reason: "empty generation list".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn summarize_posts_bounds_and_reads_summary_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/facebook/bart-large-cnn")
            .match_header("authorization", "Bearer hf-test")
            .match_body(Matcher::PartialJson(json!({
                "inputs": "long text",
                "parameters": { "min_length": 10, "max_length": 50, "do_sample": false }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"summary_text": "short"}]"#)
            .create_async()
            .await;

        let model = HuggingFaceModel::new(
            &server.url(),
            Some(SecretString::from("hf-test")),
            "facebook/bart-large-cnn",
            "gpt2",
        );
        let summary = model
            .summarize("long text", SummaryBounds::MAIL)
            .await
            .unwrap();

        assert_eq!(summary, "short");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_reads_generated_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gpt2")
            .match_body(Matcher::PartialJson(json!({
                "parameters": { "max_new_tokens": 30 }
            })))
            .with_status(200)
            .with_body(r#"[{"generated_text": "prompt and more"}]"#)
            .create_async()
            .await;

        let model = HuggingFaceModel::new(&server.url(), None, "facebook/bart-large-cnn", "gpt2");
        let text = model.generate("prompt", 30).await.unwrap();

        assert_eq!(text, "prompt and more");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_request_failed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gpt2")
            .with_status(503)
            .with_body(r#"{"error": "Model gpt2 is currently loading"}"#)
            .create_async()
            .await;

        let model = HuggingFaceModel::new(&server.url(), None, "bart", "gpt2");
        let err = model.generate("prompt", 30).await.unwrap_err();

        assert!(matches!(err, ModelError::RequestFailed { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn empty_output_list_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/bart")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let model = HuggingFaceModel::new(&server.url(), None, "bart", "gpt2");
        let err = model
            .summarize("text", SummaryBounds::DEFAULT)
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::InvalidResponse { .. }));
    }
}
