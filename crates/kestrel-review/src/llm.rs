use std::time::Duration;

use async_trait::async_trait;
use kestrel_core::{KestrelError, LlmConfig};
use serde::{Deserialize, Serialize};

use crate::prompt::{self, Finding};

/// The one model identifier known to support strict JSON response mode.
/// Other models are asked for JSON in the prompt but not forced.
const JSON_MODE_MODEL: &str = "gpt-4-1106-preview";

/// A message in a chat conversation with the completion service.
///
/// # Examples
///
/// ```
/// use kestrel_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::System,
///     content: "Review this code".into(),
/// };
/// assert!(matches!(msg.role, Role::System));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// The completion-service seam.
///
/// The pipeline is generic over this trait so tests can inject doubles and
/// no process-global client state exists.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one chat completion request and return the raw text response.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, KestrelError>;

    /// The model identifier requests are issued against.
    fn model(&self) -> &str;
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint.
/// Requests use the fixed review sampling configuration: temperature 0.2,
/// at most 700 generated tokens, `top_p` 1, no frequency or presence
/// penalty.
///
/// # Examples
///
/// ```
/// use kestrel_core::LlmConfig;
/// use kestrel_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new completion client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, KestrelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| KestrelError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, KestrelError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");
        let url = format!("{base_url}/v1/chat/completions");

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.2,
            "max_tokens": 700,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0,
        });
        if self.config.model == JSON_MODE_MODEL {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request = request.header("Content-Type", "application/json");

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| KestrelError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(KestrelError::Llm(format!(
                "completion API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| KestrelError::Llm(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                KestrelError::Llm(format!("unexpected response structure: {response_body}"))
            })?;

        Ok(content.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Outcome of reviewing a single chunk.
///
/// A failed unit and a clean "no issues" verdict both contribute zero
/// comments to the run, but they are kept distinct here so the stats can
/// report them separately.
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// The service responded with a parseable (possibly empty) findings list.
    Reviewed(Vec<Finding>),
    /// Transport, JSON, or shape failure; carries the reason for logging.
    Failed(String),
}

/// Send one review prompt and interpret the response.
///
/// Never propagates an error: every transport, JSON, or shape failure
/// resolves to [`ChunkOutcome::Failed`]. One chunk's failure must not abort
/// the run.
pub async fn request_reviews<C>(client: &C, prompt_text: &str) -> ChunkOutcome
where
    C: CompletionClient + ?Sized,
{
    let messages = vec![ChatMessage {
        role: Role::System,
        content: prompt_text.to_string(),
    }];

    match client.complete(messages).await {
        Ok(text) => match prompt::parse_review_response(&text) {
            Ok(findings) => ChunkOutcome::Reviewed(findings),
            Err(e) => ChunkOutcome::Failed(format!("unusable response: {e}")),
        },
        Err(e) => ChunkOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_succeeds() {
        let config = LlmConfig::default();
        assert!(LlmClient::new(&config).is_ok());
    }

    #[test]
    fn model_returns_config_model() {
        let config = LlmConfig {
            model: "gpt-4o-mini".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn chat_message_serializes() {
        let msg = ChatMessage {
            role: Role::System,
            content: "hello".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }

    struct CannedClient {
        response: Result<String, String>,
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String, KestrelError> {
            self.response
                .clone()
                .map_err(KestrelError::Llm)
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn request_reviews_parses_findings() {
        let client = CannedClient {
            response: Ok(r#"{"reviews":[{"lineNumber":5,"reviewComment":"check this"}]}"#.into()),
        };
        match request_reviews(&client, "prompt").await {
            ChunkOutcome::Reviewed(findings) => {
                assert_eq!(findings.len(), 1);
                assert_eq!(findings[0].review_comment, "check this");
            }
            ChunkOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn request_reviews_absorbs_transport_errors() {
        let client = CannedClient {
            response: Err("connection refused".into()),
        };
        assert!(matches!(
            request_reviews(&client, "prompt").await,
            ChunkOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn request_reviews_absorbs_garbage_responses() {
        let client = CannedClient {
            response: Ok("I could not find any JSON to give you".into()),
        };
        assert!(matches!(
            request_reviews(&client, "prompt").await,
            ChunkOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn empty_reviews_is_a_clean_outcome() {
        let client = CannedClient {
            response: Ok(r#"{"reviews":[]}"#.into()),
        };
        match request_reviews(&client, "prompt").await {
            ChunkOutcome::Reviewed(findings) => assert!(findings.is_empty()),
            ChunkOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
        }
    }
}
