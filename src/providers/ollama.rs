use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::response::{abbreviate, extract_translation};
use crate::providers::{http_client, ModelInfo, Provider, Segment, TranslateParams, TranslateResult};

/// Base URL used when a provider record leaves it empty
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API, without trailing slash
    base_url: String,
    /// Model used when a request leaves it empty
    default_model: String,
    /// HTTP client for making requests
    client: Client,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Whether to stream the response
    stream: bool,
    /// Format to return a response in
    format: String,
    /// Additional model parameters
    options: GenerationOptions,
}

impl ChatRequest {
    /// Create a non-streaming JSON-mode chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            format: "json".to_string(),
            options: GenerationOptions { temperature },
        }
    }
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response message; absent when the server returns an empty body object
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

/// Response of `GET /api/tags`
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

impl Ollama {
    /// Create a new Ollama client for the given base URL and default model
    pub fn new(base_url: impl Into<String>, default_model: impl Into<String>) -> Result<Self, ProviderError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            default_model: default_model.into(),
            client: http_client()?,
        })
    }

    /// Base URL the client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat with the Ollama API
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, response_text);
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                message: format!("ollama translate: {}; body: {}", status, response_text),
            });
        }

        serde_json::from_str::<ChatResponse>(&response_text).map_err(|e| {
            error!(
                "Failed to parse Ollama API chat response: {}. Raw response (first 500 chars): {}",
                e,
                abbreviate(&response_text, 500)
            );
            ProviderError::Parse(abbreviate(&response_text, 2000))
        })
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn translate(
        &self,
        _segment: &Segment,
        params: &TranslateParams,
    ) -> Result<TranslateResult, ProviderError> {
        let model = if params.model.is_empty() {
            self.default_model.as_str()
        } else {
            params.model.as_str()
        };

        let request = ChatRequest::new(
            model,
            vec![
                ChatMessage::system(params.system_prompt.clone()),
                ChatMessage::user(params.user_prompt.clone()),
            ],
            params.temperature,
        );

        debug!("Ollama chat request: model={}", model);
        let response = self.chat(&request).await?;

        let content = response
            .message
            .map(|m| m.content)
            .unwrap_or_default()
            .trim()
            .to_string();
        let translation = extract_translation(&content)?;

        Ok(TranslateResult { translation, raw: content })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                message: format!("ollama list models: {}; body: {}", status, body),
            });
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo { name: m.name, ..ModelInfo::default() })
            .collect())
    }
}
