//! OpenAI-compatible chat completions provider.
//! Any endpoint speaking `POST {base}/chat/completions` works here.

use super::http_client::build_provider_client_with_timeout;
use super::scrub::sanitize_api_error;
use super::traits::Provider;
use super::types::{ChatRequest, ChatResponse, CompletionRequest};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;

pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: Option<String>,
    /// Pre-computed chat completions URL.
    chat_url: String,
    timeout_secs: u64,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let chat_url = if base_url.ends_with("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            name: name.to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            chat_url,
            timeout_secs,
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    fn apply_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    fn request_error(&self, message: impl Into<String>) -> LlmError {
        LlmError::Request {
            provider: self.name.clone(),
            message: message.into(),
        }
    }

    async fn call_chat_completions(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let response = self
            .apply_auth_header(self.client.post(&self.chat_url).json(request))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LlmError::Timeout {
                        provider: self.name.clone(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    self.request_error(sanitize_api_error(&error.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.request_error(format!(
                "HTTP {}: {}",
                status.as_u16(),
                sanitize_api_error(&body)
            )));
        }

        response
            .json()
            .await
            .map_err(|error| self.request_error(format!("response decode failed: {error}")))
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<String> {
        if self.api_key.is_none() {
            anyhow::bail!(
                "{} API key not set. Set llm.api_key in config.toml or LLM_API_KEY.",
                self.name
            );
        }

        let wire = ChatRequest::from_completion(request);
        let chat_response = self.call_chat_completions(&wire).await?;

        if let Some(usage) = &chat_response.usage {
            tracing::debug!(
                provider = %self.name,
                model = chat_response.model.as_deref().unwrap_or(request.model),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "judge completion finished"
            );
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::EmptyResponse {
                    provider: self.name.clone(),
                }
                .into()
            })
    }
}
