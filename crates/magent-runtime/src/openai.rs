//! OpenAI-compatible LLM Provider
//!
//! Implementation of `LlmProvider` for chat-completions endpoints.

use std::time::Duration;

use async_trait::async_trait;
use magent_core::{
    error::{AgentError, Result},
    message::{Message, ToolCallRequest},
    provider::LlmProvider,
    schema::{FunctionSpec, ToolSchema},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Bearer token; omitted from requests when `None`
    pub api_key: Option<String>,

    /// Model identifier sent with every request
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup; unset or blank values keep defaults
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            base_url: get("MAGENT_BASE_URL").unwrap_or(defaults.base_url),
            api_key: get("MAGENT_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            model: get("MAGENT_MODEL").unwrap_or(defaults.model),
            timeout_secs: get("MAGENT_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Chat-completions model backend
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    chat_url: String,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        let chat_url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            chat_url,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    pub const fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionSpec<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallRequest>>,
}

/// Map the first choice to a terminal or tool-call message
fn into_message(response: ChatResponse) -> Result<Message> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::InvalidResponse("response has no choices".into()))?;

    if choice.finish_reason.as_deref() == Some("tool_calls") {
        Ok(Message::tool_call(
            choice.message.content,
            choice.message.tool_calls.unwrap_or_default(),
        ))
    } else {
        Ok(Message::assistant(choice.message.content.unwrap_or_default()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            tools: tools.iter().map(ToolSchema::function_spec).collect(),
        };

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat request"
        );

        let response = self
            .authorize(self.client.post(&self.chat_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%status, "Chat request rejected");
            return Err(
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    AgentError::ProviderUnavailable(format!("{status}: {text}"))
                } else {
                    AgentError::Provider(format!("{status}: {text}"))
                },
            );
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        into_message(parsed)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        match self.authorize(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Model backend health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magent_core::schema::{self, Signature};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            base_url: format!("{}/v1", server.uri()),
            api_key: Some("test-key".into()),
            model: "test-model".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    async fn mount(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn add_schema() -> ToolSchema {
        schema::derive_from_parts(
            "add",
            Some("Add two numbers.\n\nArgs:\n    a: first\n    b: second\n"),
            &Signature::new().required::<i64>("a").required::<i64>("b"),
        )
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_from_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MAGENT_BASE_URL", "http://localhost:8000/v1"),
            ("OPENAI_API_KEY", "sk-fallback"),
            ("MAGENT_MODEL", "llama3.2"),
            ("MAGENT_TIMEOUT_SECS", "not a number"),
        ]);
        let config = OpenAiConfig::from_vars(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.timeout_secs, 120);
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-123",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hello", "tool_calls": null},
                    "finish_reason": "stop"
                }]
            })),
        )
        .await;

        let reply = provider_for(&server)
            .complete(&[Message::user("hi")], &[])
            .await
            .unwrap();
        assert_eq!(reply, Message::assistant("hello"));
    }

    #[tokio::test]
    async fn test_tool_call_answer() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc",
                            "type": "function",
                            "function": {"name": "add", "arguments": "{\"a\":2,\"b\":3}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })),
        )
        .await;

        let reply = provider_for(&server)
            .complete(&[Message::user("2 + 3?")], &[add_schema()])
            .await
            .unwrap();

        assert!(!reply.is_terminal());
        assert!(reply.content().is_none());
        let calls = reply.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_abc");
        assert_eq!(calls[0].name(), "add");
        assert_eq!(calls[0].parse_arguments().unwrap()["b"], 3);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "hi"}
                ],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "add",
                        "parameters": {"type": "object", "required": ["a", "b"]}
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider_for(&server)
            .complete(&[Message::system("Be brief."), Message::user("hi")], &[add_schema()])
            .await
            .unwrap();
        assert_eq!(reply.content(), Some("ok"));
    }

    #[tokio::test]
    async fn test_tools_omitted_when_empty() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
            })),
        )
        .await;

        provider_for(&server).complete(&[Message::user("hi")], &[]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(503).set_body_string("overloaded")).await;
        let err = provider_for(&server).complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(_)));
        assert!(err.is_retryable());

        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(400).set_body_string("bad request")).await;
        let err = provider_for(&server).complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(ref msg) if msg.contains("bad request")));
    }

    #[tokio::test]
    async fn test_malformed_bodies() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(200).set_body_string("<html>not json</html>")).await;
        let err = provider_for(&server).complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));

        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(200).set_body_json(json!({"choices": []}))).await;
        let err = provider_for(&server).complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let provider = OpenAiProvider::new(OpenAiConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        let err = provider.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(err.is_backend_failure());
        assert!(!provider.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        assert!(provider_for(&server).health_check().await.unwrap());
    }
}
