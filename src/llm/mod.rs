//! Summarization and text-generation services.
//!
//! The pipeline treats models as opaque text-in/text-out services behind
//! [`TextModel`]. Two backends exist:
//! - **Hugging Face**: Inference API over reqwest (`facebook/bart-large-cnn`
//!   for summaries, `gpt2` for reply suggestions by default)
//! - **Anthropic / OpenAI**: chat models via rig-core, bridged by `RigAdapter`

pub mod huggingface;
mod rig_adapter;

pub use huggingface::HuggingFaceModel;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::config::{ModelBackend, ModelConfig};
use crate::error::ModelError;

/// Token bounds for an abstractive summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    pub min_length: u32,
    pub max_length: u32,
}

impl SummaryBounds {
    /// Bounds for chat messages and digests.
    pub const DEFAULT: Self = Self {
        min_length: 10,
        max_length: 80,
    };

    /// Tighter bounds for email snippets.
    pub const MAIL: Self = Self {
        min_length: 10,
        max_length: 50,
    };
}

impl Default for SummaryBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// An external model consumed as a black box.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Abstractive summary bounded by `bounds`, decoded deterministically.
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, ModelError>;

    /// Free-form continuation of `prompt`, capped at `max_new_tokens`.
    ///
    /// The returned text may include the prompt itself; callers extract what
    /// they need.
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, ModelError>;
}

/// Create the text model selected by configuration.
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn TextModel>, ModelError> {
    match config.backend {
        ModelBackend::HuggingFace => {
            tracing::info!(
                summary_model = %config.summary_model,
                reply_model = %config.reply_model,
                "Using Hugging Face Inference API"
            );
            Ok(Arc::new(HuggingFaceModel::new(
                &config.hf_api_base,
                config.hf_api_token.clone(),
                &config.summary_model,
                &config.reply_model,
            )))
        }
        ModelBackend::Anthropic => create_anthropic_model(config),
        ModelBackend::OpenAi => create_openai_model(config),
    }
}

fn llm_api_key(config: &ModelConfig, provider: &str) -> Result<String, ModelError> {
    config
        .llm_api_key
        .as_ref()
        .map(|k| k.expose_secret().to_string())
        .ok_or_else(|| ModelError::RequestFailed {
            model: config.llm_model.clone(),
            reason: format!("no API key configured for {provider}"),
        })
}

fn create_anthropic_model(config: &ModelConfig) -> Result<Arc<dyn TextModel>, ModelError> {
    use rig::providers::anthropic;

    let key = llm_api_key(config, "anthropic")?;
    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(&key).map_err(|e| ModelError::RequestFailed {
            model: config.llm_model.clone(),
            reason: format!("Failed to create Anthropic client: {}", e),
        })?;

    let model = client.completion_model(&config.llm_model);
    tracing::info!("Using Anthropic (model: {})", config.llm_model);
    Ok(Arc::new(RigAdapter::new(model, &config.llm_model)))
}

fn create_openai_model(config: &ModelConfig) -> Result<Arc<dyn TextModel>, ModelError> {
    use rig::providers::openai;

    let key = llm_api_key(config, "openai")?;
    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(&key).map_err(|e| ModelError::RequestFailed {
            model: config.llm_model.clone(),
            reason: format!("Failed to create OpenAI client: {}", e),
        })?;

    let model = client.completion_model(&config.llm_model);
    tracing::info!("Using OpenAI (model: {})", config.llm_model);
    Ok(Arc::new(RigAdapter::new(model, &config.llm_model)))
}
