use super::{ChatRequest, CompletionError, LlmClient, LlmResponse};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAIClient {
    pub base_url: String,
    pub api_key: String,
    pub client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, CompletionError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();

        // Error payloads can arrive with either a failing or a 200 status.
        if let Some(msg) = parsed.as_ref().and_then(api_error_message) {
            return Err(CompletionError::Api(msg));
        }
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json = parsed
            .ok_or_else(|| CompletionError::Transport("response body is not JSON".into()))?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or(CompletionError::EmptyContent)?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "openai".to_string(),
            model: request.model.clone(),
            meta: json!({
                "id": json.get("id"),
                "usage": json.get("usage"),
                "finish_reason": json.pointer("/choices/0/finish_reason"),
            }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn api_error_message(v: &serde_json::Value) -> Option<String> {
    let err = v.get("error")?;
    if err.is_null() {
        return None;
    }
    let msg = err
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-test".into(),
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.0,
            reasoning_effort: None,
            response_format: Some(json!({"type": "json_object"})),
        }
    }

    async fn client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new(server.uri(), "test-key".into(), Duration::from_secs(5))
            .expect("client builds")
    }

    #[tokio::test]
    async fn returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-test", "temperature": 0.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cmpl-1",
                "choices": [{
                    "message": {"role": "assistant", "content": "{\"choice\":\"pull\"}"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let resp = client(&server).await.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "{\"choice\":\"pull\"}");
        assert_eq!(resp.model, "gpt-test");
        assert_eq!(resp.meta["id"], "cmpl-1");
    }

    #[tokio::test]
    async fn error_payload_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::Api("Rate limit reached".into()));
    }

    #[tokio::test]
    async fn bare_failure_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).await.complete(&request()).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Status {
                status: 502,
                body: "bad gateway".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_or_blank_content_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "   "}}]
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::EmptyContent);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let c = OpenAIClient::new(
            "http://127.0.0.1:1".into(),
            "k".into(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = c.complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
