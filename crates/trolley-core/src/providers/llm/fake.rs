use super::{ChatRequest, CompletionError, LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_FAKE_RESPONSE: &str = r#"{"principles":["do no harm"],"choice":"nothing","reasoning":"Offline fake provider.","assumptions":null}"#;

#[derive(Debug, Clone)]
pub enum FakeReply {
    Text(String),
    Fail(CompletionError),
}

/// Offline client. Replies are chosen by the first rule whose needle occurs in
/// the prompt, falling back to a fixed response.
#[derive(Debug)]
pub struct FakeClient {
    fixed_response: String,
    rules: Vec<(String, FakeReply)>,
    calls: AtomicUsize,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            fixed_response: DEFAULT_FAKE_RESPONSE.to_string(),
            rules: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = response.into();
        self
    }

    pub fn when_prompt_contains(mut self, needle: impl Into<String>, reply: FakeReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = request.prompt();
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| FakeReply::Text(self.fixed_response.clone()));

        match reply {
            FakeReply::Text(text) => Ok(LlmResponse {
                text,
                provider: "fake".to_string(),
                model: request.model.clone(),
                meta: serde_json::json!({}),
            }),
            FakeReply::Fail(e) => Err(e),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
