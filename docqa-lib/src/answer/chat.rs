use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::answer::{Generator, Prompt};
use crate::config::{API_KEY_ENV, GenerationConfig};
use crate::{Error, Result};

/// Client for an OpenAI-compatible `chat/completions` endpoint (Groq by default).
///
/// Each call is a single blocking request; there is no retry.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    endpoint: Url,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ChatCompletionsClient {
    /// Create a client from generation settings.
    ///
    /// The API key is taken from the settings or the `GROQ_API_KEY`
    /// environment variable. A missing key is only reported when
    /// [`generate`](Generator::generate) is called.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        config.validate()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            endpoint: config.endpoint()?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key: config.resolve_api_key(),
            agent,
        })
    }

    /// Override the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Whether an API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Generator for ChatCompletionsClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &Prompt) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "no API key configured; set {API_KEY_ENV} or generation.api_key"
            ))
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| Error::Generation(format!("failed to serialize request: {e}")))?;

        debug!(endpoint = %self.endpoint, model = %self.model, "sending chat completion request");

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .map_err(|e| Error::Generation(format!("request to {} failed: {e}", self.endpoint)))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Generation(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "generation service returned an error");
            return Err(Error::Generation(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_message(&text)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Generation(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Generation("response contained no answer".to_string()))
    }
}

/// Extract the service's error message, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ErrorKind;
    use crate::answer::build_prompt;

    fn client_for(server: &MockServer) -> ChatCompletionsClient {
        let config = GenerationConfig {
            base_url: format!("{}/openai/v1", server.uri()),
            timeout_secs: 5,
            ..GenerationConfig::default()
        };
        ChatCompletionsClient::from_config(&config)
            .expect("config should be valid")
            .with_api_key("test-key")
    }

    async fn generate(client: ChatCompletionsClient, prompt: Prompt) -> Result<String> {
        tokio::task::spawn_blocking(move || client.generate(&prompt))
            .await
            .expect("blocking task should not panic")
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": { "role": "assistant", "content": content },
                    "finish_reason": "stop"
                }
            ]
        })
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#),
            "Invalid API Key"
        );
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_missing_api_key() {
        let client = ChatCompletionsClient {
            api_key: None,
            ..ChatCompletionsClient::from_config(&GenerationConfig::default())
                .expect("default config should be valid")
        };
        assert!(!client.has_api_key());

        let err = client.generate(&build_prompt("q", &["c"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = ChatCompletionsClient::from_config(&GenerationConfig::default())
            .expect("default config should be valid")
            .with_api_key("super-secret");
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("It is 42.")))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = build_prompt("What is the answer?", &["the answer is 42"]);
        let answer = generate(client_for(&server), prompt.clone()).await.unwrap();
        assert_eq!(answer, "It is 42.");

        let requests = server.received_requests().await.expect("recording enabled");
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], prompt.system.as_str());
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], prompt.user.as_str());
    }

    #[tokio::test]
    async fn test_http_error_is_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid API Key", "type": "invalid_request_error" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = generate(client_for(&server), build_prompt("q", &["c"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationFailure);
        assert_eq!(err.to_string(), "generation error: HTTP 401: Invalid API Key");
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = generate(client_for(&server), build_prompt("q", &["c"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 503: overloaded"));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = generate(client_for(&server), build_prompt("q", &["c"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationFailure);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = generate(client_for(&server), build_prompt("q", &["c"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse response"));
    }

    #[test]
    fn test_unreachable_service() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9/v1/".to_string(),
            timeout_secs: 2,
            ..GenerationConfig::default()
        };
        let client = ChatCompletionsClient::from_config(&config)
            .unwrap()
            .with_api_key("k");

        let err = client.generate(&build_prompt("q", &["c"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationFailure);
    }
}
