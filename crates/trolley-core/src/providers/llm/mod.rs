use crate::model::ReasoningEffort;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Outbound chat-completion request. Serializes to the OpenAI wire body as-is,
/// which is also the snapshot stored on each vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn prompt(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Provider-level failure. The decision layer attaches model and problem ids.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// The endpoint answered with an error payload.
    #[error("API error: {0}")]
    Api(String),
    /// Non-success status without a recognizable error payload.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response has no content")]
    EmptyContent,
    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, CompletionError>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod openai;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_errors_render_for_logs() {
        assert_eq!(CompletionError::Api("quota".into()).to_string(), "API error: quota");
        let status = CompletionError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(status.to_string(), "HTTP 502: bad gateway");
        assert_eq!(CompletionError::EmptyContent.to_string(), "response has no content");

        let boxed: Box<dyn std::error::Error> =
            Box::new(CompletionError::Transport("reset".into()));
        assert_eq!(boxed.to_string(), "transport error: reset");
    }
}
