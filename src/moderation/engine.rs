use super::parse::parse_response;
use super::prompt::{PromptContext, SYSTEM_PROMPT};
use super::report::Decision;
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, Provider, ResponseFormat};
use std::sync::Arc;

pub const MODEL_CALL_FAILED: &str = "model call failed";

/// Asks the judge for a verdict. `decide` never fails: provider errors and
/// unusable replies both become a zero-confidence escalation.
pub struct DecisionEngine {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    debug_raw: bool,
}

impl DecisionEngine {
    pub fn new(provider: Arc<dyn Provider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            debug_raw: config.debug_raw,
        }
    }

    pub async fn decide(&self, context: &PromptContext<'_>) -> Decision {
        let prompt = context.build_prompt();
        let Some(raw) = self.call(&prompt).await else {
            return Decision::escalate(MODEL_CALL_FAILED);
        };
        if self.debug_raw {
            tracing::debug!(provider = self.provider.name(), raw = %raw, "judge raw output");
        }
        parse_response(&raw)
    }

    /// Structured call first, then one plain retry.
    async fn call(&self, prompt: &str) -> Option<String> {
        let structured = CompletionRequest::new(prompt, &self.model, self.temperature)
            .with_system(SYSTEM_PROMPT)
            .with_format(ResponseFormat::JsonObject);

        match self.provider.complete(&structured).await {
            Ok(raw) => return Some(raw),
            Err(error) => tracing::warn!(
                provider = self.provider.name(),
                %error,
                "structured judge call failed, retrying as plain text"
            ),
        }

        match self
            .provider
            .chat_with_system(Some(SYSTEM_PROMPT), prompt, &self.model, self.temperature)
            .await
        {
            Ok(raw) => Some(raw),
            Err(error) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    %error,
                    "judge call failed twice, escalating"
                );
                None
            }
        }
    }
}
