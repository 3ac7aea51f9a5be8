//! Bridges rig's `CompletionModel` to our `TextModel` trait.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{CompletionModel, Prompt};

use super::{SummaryBounds, TextModel};
use crate::error::ModelError;

const SUMMARY_PREAMBLE: &str = "You summarize messages. Reply with the summary only, \
no preamble, no quotes. Keep every fact you state faithful to the input.";

const GENERATION_PREAMBLE: &str = "Continue the text you are given. Reply with the \
continuation only.";

/// Chat-completion model used as a summarizer and a generator.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }

    fn request_failed(&self, reason: impl std::fmt::Display) -> ModelError {
        ModelError::RequestFailed {
            model: self.model_name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl<M> TextModel for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, ModelError> {
        let preamble = format!(
            "{SUMMARY_PREAMBLE} Use between {} and {} tokens.",
            bounds.min_length, bounds.max_length
        );
        let agent = AgentBuilder::new(self.model.clone())
            .preamble(&preamble)
            .temperature(0.0)
            .max_tokens(u64::from(bounds.max_length))
            .build();

        let summary = agent
            .prompt(text.to_string())
            .await
            .map_err(|e| self.request_failed(e))?;
        Ok(summary.trim().to_string())
    }

    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, ModelError> {
        let agent = AgentBuilder::new(self.model.clone())
            .preamble(GENERATION_PREAMBLE)
            .max_tokens(u64::from(max_new_tokens))
            .build();

        let continuation = agent
            .prompt(prompt.to_string())
            .await
            .map_err(|e| self.request_failed(e))?;
        // Chat models answer with the continuation only; prepend the prompt so
        // callers see the same shape as a full-text generation model.
        Ok(format!("{prompt} {continuation}"))
    }
}
