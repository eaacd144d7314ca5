use super::types::{CompletionRequest, ResponseFormat};
use async_trait::async_trait;

/// A chat-completion backend used as the moderation judge.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn name(&self) -> &str;

    /// Run one completion and return the raw reply text.
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<String>;

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let request = CompletionRequest {
            system_prompt,
            message,
            model,
            temperature,
            response_format: ResponseFormat::Text,
        };
        self.complete(&request).await
    }
}
