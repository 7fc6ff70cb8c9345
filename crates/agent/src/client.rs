use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::types::{ChatMessage, Tool};
use crate::AgentError;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Completion boundary: an ordered message sequence in, one assistant
/// message out. The seam the agent loop and tests mock.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
    ) -> Result<ChatMessage, AgentError>;
}

/// Model parameters applied to every completion call.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// OpenAI-compatible chat-completions client (HTTP direct, no SDK).
pub struct OpenAIClient {
    http: reqwest::Client,
    base_url: String,
    config: CompletionConfig,
}

impl OpenAIClient {
    pub fn new(api_key: &str, config: CompletionConfig) -> Result<Self, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| AgentError::Api {
                status: 0,
                body: "invalid API key format".to_string(),
            })?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            base_url: OPENAI_API_BASE.to_string(),
            config,
        })
    }

    /// Override the base URL (Azure-style gateways, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
    ) -> Result<ChatMessage, AgentError> {
        let mut request = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        if !tools.is_empty() {
            let obj = request.as_object_mut().expect("request is an object");
            obj.insert("tools".to_string(), serde_json::to_value(tools).expect("tools serialize"));
            obj.insert("tool_choice".to_string(), serde_json::json!("auto"));
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| AgentError::Api {
                status: status.as_u16(),
                body: format!("undecodable completion payload: {e}"),
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(AgentError::EmptyResponse)
    }
}
