//! LLM Client — the model oracle every detection prompt is evaluated against.
//!
//! The detection engine depends only on `ModelOracle`; `OpenAiClient` is the
//! production implementation over any OpenAI-compatible Chat Completions
//! endpoint (OpenAI itself, GitHub Models, a local gateway).
//!
//! Retry policy lives here, not in the evaluator: a prompt whose call still
//! fails after the last attempt contributes no signal.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Everything the oracle needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    /// Structured-output contract, sent as an OpenAI `json_schema` response format.
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    pub text: String,
}

/// A language model that turns a rendered conversation into text.
#[async_trait]
pub trait ModelOracle: Send + Sync {
    async fn complete(&self, request: OracleRequest) -> Result<OracleResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAiClient
// ────────────────────────────────────────────────────────────────────────────

/// Chat Completions client with retry on 429 and 5xx responses.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry_base_delay: Duration,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    /// Overrides the first backoff step; later steps double it.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

#[async_trait]
impl ModelOracle for OpenAiClient {
    async fn complete(&self, request: OracleRequest) -> Result<OracleResponse, LlmError> {
        let request_body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
            response_format: request.response_schema.as_ref().map(|schema| ResponseFormat {
                format_type: "json_schema",
                json_schema: schema,
            }),
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let completion: ChatCompletionResponse = response.json().await?;

            if let Some(usage) = &completion.usage {
                debug!(
                    "LLM call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                    request.model, usage.prompt_tokens, usage.completion_tokens
                );
            }

            let text = completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or(LlmError::EmptyContent)?;

            return Ok(OracleResponse {
                text: text.trim().to_string(),
            });
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(schema: Option<serde_json::Value>) -> OracleRequest {
        OracleRequest {
            model: "gpt-4o".to_string(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: "Answer True or False.".to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: "Is this spam? buy now".to_string(),
                },
            ],
            temperature: 0.0,
            max_output_tokens: if schema.is_none() { Some(10) } else { None },
            response_schema: schema,
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 1 }
        })
    }

    async fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(server.uri(), "sk-test".to_string())
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), json!("assistant"));
    }

    #[tokio::test]
    async fn test_complete_simple_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "Answer True or False." },
                    { "role": "user", "content": "Is this spam? buy now" }
                ],
                "temperature": 0.0,
                "max_tokens": 10
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(" True \n")))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).await.complete(request(None)).await.unwrap();
        assert_eq!(response.text, "True");
    }

    #[tokio::test]
    async fn test_complete_sends_json_schema_response_format() {
        let schema = json!({ "name": "spam_result", "schema": { "type": "object" } });
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_json(json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "Answer True or False." },
                    { "role": "user", "content": "Is this spam? buy now" }
                ],
                "temperature": 0.0,
                "response_format": { "type": "json_schema", "json_schema": schema.clone() }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"is_spam\":false}")))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .await
            .complete(request(Some(schema)))
            .await
            .unwrap();
        assert_eq!(response.text, "{\"is_spam\":false}");
    }

    #[tokio::test]
    async fn test_complete_retries_on_rate_limit_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("False")))
            .mount(&server)
            .await;

        let response = client_for(&server).await.complete(request(None)).await.unwrap();
        assert_eq!(response.text, "False");
    }

    #[tokio::test]
    async fn test_complete_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(u64::from(MAX_RETRIES))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .complete(request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_complete_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .complete(request(None))
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .complete(request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
