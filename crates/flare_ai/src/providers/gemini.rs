//! Google Gemini through its OpenAI-compatible endpoint
//! (`generativelanguage.googleapis.com/v1beta/openai`).

use async_trait::async_trait;
use flare_core::StarterConfig;
use serde::Serialize;

use super::openai_wire::ChatCompletionResponse;
use super::{AiProvider, ProviderError};
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

// ---------------------------------------------------------------------------
// Wire types (serialization only)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GeminiChatRequest<'a> {
    model: &'a str,
    messages: Vec<GeminiMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct GeminiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// An empty `api_key` yields a provider that reports itself unavailable.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key: Some(api_key).filter(|k| !k.is_empty()),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &StarterConfig) -> Self {
        Self::new(config.ai_api_key.clone().unwrap_or_default()).with_base_url(&config.ai_base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn convert_messages<'a>(
        messages: &'a [ChatMessage],
        system_prompt: Option<&'a str>,
    ) -> Vec<GeminiMessage<'a>> {
        system_prompt
            .map(|sys| GeminiMessage {
                role: "system",
                content: sys,
            })
            .into_iter()
            .chain(messages.iter().map(|m| GeminiMessage {
                role: m.role.as_str(),
                content: &m.content,
            }))
            .collect()
    }

    fn build_body<'a>(&self, request: &'a ChatRequest) -> GeminiChatRequest<'a> {
        GeminiChatRequest {
            model: &request.model,
            messages: Self::convert_messages(&request.messages, request.system_prompt.as_deref()),
            stream: false,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            response_format: request.response_format.as_ref(),
        }
    }

    fn require_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::InvalidKey)
    }

    async fn post_completions(
        &self,
        body: &GeminiChatRequest<'_>,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.require_key()?;
        let url = format!("{}/chat/completions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        check_status(resp).await
    }
}

/// Map HTTP error codes to typed errors.
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::InvalidKey);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimit);
    }
    if status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::GATEWAY_TIMEOUT
    {
        return Err(ProviderError::Timeout);
    }
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Other(format!(
            "Gemini API error {status}: {text}"
        )));
    }
    Ok(resp)
}

/// Decode a successful `/chat/completions` body.
pub(crate) async fn parse_response(
    resp: reqwest::Response,
    fallback_model: &str,
) -> Result<ChatResponse, ProviderError> {
    let data: ChatCompletionResponse = resp
        .json()
        .await
        .map_err(|e| ProviderError::Other(format!("JSON parse error: {e}")))?;
    data.into_chat_response(fallback_model)
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Google Gemini"
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.build_body(request);
        tracing::debug!(model = %request.model, "Gemini chat request");
        let resp = self.post_completions(&body).await?;
        parse_response(resp, &request.model).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishReason, NamedSchema};

    fn sample_request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("Hello")],
            model: "gemini-2.5-flash".into(),
            max_tokens: 512,
            temperature: Some(0.2),
            system_prompt: None,
            response_format: None,
        }
    }

    fn mock_response(status: u16, payload: &'static str) -> reqwest::Response {
        let body_stream = futures::stream::once(async move {
            Ok::<_, reqwest::Error>(bytes::Bytes::from(payload))
        });
        let resp = http::Response::builder()
            .status(status)
            .body(reqwest::Body::wrap_stream(body_stream))
            .unwrap();
        reqwest::Response::from(resp)
    }

    #[test]
    fn body_carries_response_format() {
        let provider = GeminiProvider::new("AIza-test".into());
        let mut req = sample_request();
        req.system_prompt = Some("Answer in JSON.".into());
        req.response_format = Some(ResponseFormat::JsonSchema {
            json_schema: NamedSchema {
                name: "guidance".into(),
                schema: serde_json::json!({"type": "object"}),
            },
        });
        let json = serde_json::to_value(provider.build_body(&req)).unwrap();

        assert_eq!(json["model"], "gemini-2.5-flash");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "guidance");
    }

    #[test]
    fn body_omits_absent_format() {
        let provider = GeminiProvider::new("AIza-test".into());
        let req = sample_request();
        let json = serde_json::to_value(provider.build_body(&req)).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn availability_follows_key() {
        assert!(GeminiProvider::new("AIza-test".into()).is_available().await);
        assert!(!GeminiProvider::new(String::new()).is_available().await);
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let provider = GeminiProvider::new(String::new());
        let err = provider.chat(&sample_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidKey));
    }

    #[test]
    fn from_config_uses_configured_endpoint() {
        let mut config = StarterConfig::default();
        config.ai_api_key = Some("k".into());
        config.ai_base_url = "http://localhost:8080/v1/".into();
        let provider = GeminiProvider::from_config(&config);
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
        assert_eq!(provider.require_key().unwrap(), "k");
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        assert!(matches!(
            check_status(mock_response(401, "")).await,
            Err(ProviderError::InvalidKey)
        ));
        assert!(matches!(
            check_status(mock_response(429, "")).await,
            Err(ProviderError::RateLimit)
        ));
        assert!(matches!(
            check_status(mock_response(504, "")).await,
            Err(ProviderError::Timeout)
        ));
        match check_status(mock_response(500, "boom")).await {
            Err(ProviderError::Other(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn parses_mock_completion() {
        let payload = r#"{"choices":[{"message":{"role":"assistant","content":"{\"ok\":true}"},"finish_reason":"stop"}],"model":"gemini-2.5-flash","usage":{"prompt_tokens":5,"completion_tokens":3,"total_tokens":8}}"#;
        let resp = check_status(mock_response(200, payload)).await.unwrap();
        let chat = parse_response(resp, "fallback").await.unwrap();
        assert_eq!(chat.content, "{\"ok\":true}");
        assert_eq!(chat.model, "gemini-2.5-flash");
        assert_eq!(chat.finish_reason, FinishReason::Stop);
        assert_eq!(chat.usage.total_tokens, 8);
    }

    #[tokio::test]
    async fn garbage_body_is_parse_error() {
        let resp = mock_response(200, "not json");
        let err = parse_response(resp, "m").await.unwrap_err();
        match err {
            ProviderError::Other(msg) => assert!(msg.starts_with("JSON parse error")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
