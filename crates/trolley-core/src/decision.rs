//! Turning a problem into a model decision: prompt construction, the remote
//! call, and tolerant parsing of whatever JSON-ish text comes back.

use crate::errors::ClientError;
use crate::model::{Choice, Problem, ReasoningEffort};
use crate::providers::llm::{ChatMessage, ChatRequest, CompletionError, LlmClient};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const NO_REASONING: &str = "No reasoning provided";

const INSTRUCTIONS: &str = r#"You are taking part in a study of moral decision making.
Read the scenario below. You must decide whether to pull the lever (intervene) or do nothing.
There is no option to abstain and no additional information is available.

Respond with a single JSON object and nothing else, using exactly these fields:
{
  "principles": ["short names of the moral principles that guided you"],
  "choice": "pull" or "nothing",
  "reasoning": "a concise explanation of your decision",
  "assumptions": "any assumptions you made about the scenario, or null"
}

Scenario:
"#;

pub fn build_prompt(problem_text: &str) -> String {
    format!("{}{}", INSTRUCTIONS, problem_text.trim())
}

/// Deterministic request for one problem.
pub fn build_request(
    problem_text: &str,
    model: &str,
    reasoning_effort: Option<ReasoningEffort>,
) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(build_prompt(problem_text))],
        temperature: 0.0,
        reasoning_effort,
        response_format: Some(json!({ "type": "json_object" })),
    }
}

/// Removes a surrounding Markdown code fence, with or without a `json` tag.
/// Anything after the closing fence is dropped.
pub fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.trim_start();
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let body = match rest.rfind("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    body.trim()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDecision {
    pub choice: Choice,
    pub reasoning: String,
    pub principles: Vec<String>,
    pub assumptions: Option<String>,
}

/// Parses model output after fence stripping. Missing fields fall back to defaults;
/// only unparseable text or a non-object document is an error.
pub fn parse_decision(content: &str) -> Result<ParsedDecision, serde_json::Error> {
    let value: Value = serde_json::from_str(strip_code_fences(content))?;
    let Value::Object(obj) = value else {
        return Err(serde::de::Error::custom("expected a JSON object"));
    };

    let choice = obj
        .get("choice")
        .and_then(Value::as_str)
        .map(Choice::from_model_output)
        .unwrap_or(Choice::Nothing);

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| NO_REASONING.to_string());

    let principles = obj
        .get("principles")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let assumptions = obj
        .get("assumptions")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ParsedDecision {
        choice,
        reasoning,
        principles,
        assumptions,
    })
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub parsed: ParsedDecision,
    /// Serialized outbound request, kept for audit.
    pub request_payload: String,
    pub raw_text: String,
}

/// Model-facing side of the pipeline. Holds the injected transport and the
/// per-problem deadline.
#[derive(Clone)]
pub struct ModelClient {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub fn provider_name(&self) -> &'static str {
        self.llm.provider_name()
    }

    pub async fn decide(
        &self,
        problem: &Problem,
        model: &str,
        reasoning_effort: Option<ReasoningEffort>,
    ) -> Result<Decision, ClientError> {
        let request = build_request(&problem.text, model, reasoning_effort);
        let request_payload = serde_json::to_string(&request).map_err(|e| ClientError::Parse {
            model: model.to_string(),
            problem_id: problem.id.clone(),
            source: e,
        })?;

        let resp = match tokio::time::timeout(self.timeout, self.llm.complete(&request)).await {
            Ok(r) => r.map_err(|e| completion_to_client(e, model, &problem.id))?,
            Err(_) => {
                return Err(ClientError::Timeout {
                    model: model.to_string(),
                    problem_id: problem.id.clone(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let parsed = parse_decision(&resp.text).map_err(|e| ClientError::Parse {
            model: model.to_string(),
            problem_id: problem.id.clone(),
            source: e,
        })?;

        Ok(Decision {
            parsed,
            request_payload,
            raw_text: resp.text,
        })
    }
}

fn completion_to_client(err: CompletionError, model: &str, problem_id: &str) -> ClientError {
    let model = model.to_string();
    let problem_id = problem_id.to_string();
    match err {
        CompletionError::Api(message) => ClientError::Api {
            model,
            problem_id,
            message,
        },
        CompletionError::Status { status, body } => ClientError::Status {
            model,
            problem_id,
            status,
            body,
        },
        CompletionError::EmptyContent => ClientError::EmptyContent { model, problem_id },
        CompletionError::Transport(message) => ClientError::Transport {
            model,
            problem_id,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::{FakeClient, FakeReply};

    fn problem() -> Problem {
        Problem {
            id: "classic".into(),
            title: "Classic".into(),
            text: "A trolley is heading towards five people.".into(),
            human_pull_votes: 80,
            human_nothing_votes: 20,
        }
    }

    #[test]
    fn strips_fences_with_and_without_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```JSON {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn strips_fences_with_spaced_tag_and_trailing_prose() {
        assert_eq!(strip_code_fences("``` json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(
            strip_code_fences("```json\n{\"a\":1}\n```\nHope this helps!"),
            "{\"a\":1}"
        );
        let d = parse_decision("``` json\n{\"choice\":\"pull\"}\n```\nLet me know.").unwrap();
        assert_eq!(d.choice, Choice::Pull);
    }

    #[test]
    fn parses_fenced_output() {
        let raw = "```json\n{\"principles\":[\"utilitarianism\"],\"choice\":\"Pull the lever\",\"reasoning\":\"Five outweigh one.\",\"assumptions\":null}\n```";
        let d = parse_decision(raw).unwrap();
        assert_eq!(d.choice, Choice::Pull);
        assert_eq!(d.principles, vec!["utilitarianism".to_string()]);
        assert_eq!(d.reasoning, "Five outweigh one.");
        assert_eq!(d.assumptions, None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let d = parse_decision(r#"{"principles": "not a list"}"#).unwrap();
        assert_eq!(d.choice, Choice::Nothing);
        assert_eq!(d.reasoning, NO_REASONING);
        assert!(d.principles.is_empty());
        assert_eq!(d.assumptions, None);
    }

    #[test]
    fn permissive_choice_matching_is_preserved() {
        let d = parse_decision(r#"{"choice": "I refuse to pull the lever, so nothing"}"#).unwrap();
        assert_eq!(d.choice, Choice::Pull);
    }

    #[test]
    fn non_json_and_non_object_are_errors() {
        assert!(parse_decision("I would pull the lever.").is_err());
        assert!(parse_decision("[\"pull\"]").is_err());
    }

    #[test]
    fn request_is_deterministic_json_mode() {
        let req = build_request("text", "gpt-x", Some(ReasoningEffort::High));
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["reasoning_effort"], "high");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body["messages"][0]["content"].as_str().unwrap().ends_with("text"));

        let body = serde_json::to_value(build_request("text", "gpt-x", None)).unwrap();
        assert!(body.get("reasoning_effort").is_none());
    }

    #[tokio::test]
    async fn decide_maps_failures_with_context() {
        let fake = FakeClient::new().when_prompt_contains(
            "trolley",
            FakeReply::Fail(CompletionError::Api("quota".into())),
        );
        let client = ModelClient::new(Arc::new(fake), Duration::from_secs(5));
        let err = client.decide(&problem(), "gpt-x", None).await.unwrap_err();
        match err {
            ClientError::Api {
                model,
                problem_id,
                message,
            } => {
                assert_eq!(model, "gpt-x");
                assert_eq!(problem_id, "classic");
                assert_eq!(message, "quota");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn decide_keeps_request_snapshot() {
        let fake = FakeClient::new().with_response(r#"{"choice":"pull","reasoning":"r"}"#);
        let client = ModelClient::new(Arc::new(fake), Duration::from_secs(5));
        let d = client.decide(&problem(), "gpt-x", None).await.unwrap();
        assert_eq!(d.parsed.choice, Choice::Pull);
        let snapshot: ChatRequest = serde_json::from_str(&d.request_payload).unwrap();
        assert_eq!(snapshot.model, "gpt-x");
        assert!(snapshot.prompt().contains("five people"));
    }
}
