//! Completion provider abstraction and the OpenAI-compatible HTTP client.
//!
//! # Responsibility
//! - Define the provider-agnostic chat completion contract.
//! - Talk to any OpenAI-compatible `/chat/completions` endpoint.
//!
//! # Invariants
//! - Requests are sent exactly once; there are no retries.
//! - Error messages never include prompt text.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default outbound timeout for completion and embedding calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionParams {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionParams {
    /// Low-temperature settings for prompts that must answer in JSON.
    pub fn structured() -> Self {
        Self {
            model: None,
            max_tokens: None,
            temperature: Some(0.2),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI provider not configured")]
    NotConfigured,
    #[error("AI request failed: {0}")]
    RequestFailed(String),
    #[error("AI response parse error: {0}")]
    ParseError(String),
    #[error("AI request timed out")]
    Timeout,
    #[error("AI server unreachable: {0}")]
    Unreachable(String),
}

impl AiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unreachable(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

/// Provider-agnostic chat completion interface.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, AiError>;

    /// Provider name for log lines.
    fn name(&self) -> &str;
}

/// Connection settings for one OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Builds the shared HTTP client used by every outbound AI call.
///
/// # Errors
/// - `RequestFailed` when the TLS backend cannot be initialized.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, AiError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|err| AiError::RequestFailed(format!("http client setup: {err}")))
}

/// Chat client for any OpenAI-compatible API (OpenAI, Perplexity, vLLM, ...).
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    name: String,
}

impl OpenAiCompatibleClient {
    pub fn new(name: impl Into<String>, client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            name: name.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, AiError> {
        let model = params.model.as_deref().unwrap_or(&self.model);
        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(AiError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status();
            log::warn!(
                "event=ai_complete module=ai status=error provider={} http_status={}",
                self.name,
                status.as_u16()
            );
            return Err(AiError::RequestFailed(format!("HTTP {status}")));
        }

        let chat_resp: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| AiError::ParseError(err.to_string()))?;

        chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AiError::ParseError("no content in response".to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::build_http_client;

    #[test]
    fn http_client_builds_with_configured_timeout() {
        assert!(build_http_client(5).is_ok());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AiError, ChatMessage, CompletionParams, CompletionProvider};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every prompt it saw.
    pub struct ScriptedProvider {
        replies: Mutex<Vec<Result<String, AiError>>>,
        pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<String, AiError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(reply: &str) -> Self {
            Self::new(vec![Ok(reply.to_string())])
        }

        pub fn failing() -> Self {
            Self::new(vec![Err(AiError::Timeout)])
        }

        pub fn last_user_prompt(&self) -> String {
            self.prompts
                .lock()
                .expect("lock should not be poisoned")
                .last()
                .and_then(|messages| messages.iter().find(|m| m.role == "user"))
                .map(|message| message.content.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _params: &CompletionParams,
        ) -> Result<String, AiError> {
            self.prompts.lock().expect("lock should not be poisoned").push(messages.to_vec());
            let mut replies = self.replies.lock().expect("lock should not be poisoned");
            if replies.is_empty() {
                return Err(AiError::RequestFailed("script exhausted".to_string()));
            }
            replies.remove(0)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
