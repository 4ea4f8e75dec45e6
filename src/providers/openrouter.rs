use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::ProviderError;
use crate::providers::response::{extract_translation, openrouter_url};
use crate::providers::{http_client, ModelInfo, Provider, Segment, TranslateParams, TranslateResult};

/// Base URL used when a provider record leaves it empty
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai";

/// Attribution headers OpenRouter shows on its dashboard
const REFERER: &str = "https://locail.app";
const TITLE: &str = "locail";

/// OpenRouter client for interacting with the OpenRouter API
#[derive(Debug)]
pub struct OpenRouter {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, with or without the `/api/v1` suffix
    base_url: String,
    /// Model used when a request leaves it empty
    default_model: String,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenRouterMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenRouterRequest {
    model: String,
    messages: Vec<OpenRouterMessage>,
    temperature: f32,
    response_format: serde_json::Value,
}

impl OpenRouterRequest {
    /// Create a request asking for strict `{"translation": string}` output
    pub fn new(model: impl Into<String>, system: &str, user: &str, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                OpenRouterMessage { role: "system".to_string(), content: system.to_string() },
                OpenRouterMessage { role: "user".to_string(), content: user.to_string() },
            ],
            temperature,
            response_format: Self::schema_format(),
        }
    }

    fn schema_format() -> serde_json::Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": "translation",
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": { "translation": { "type": "string" } },
                    "required": ["translation"],
                    "additionalProperties": false
                }
            }
        })
    }

    /// Downgrade to plain JSON mode for models without schema support
    pub fn with_json_object_format(mut self) -> Self {
        self.response_format = json!({ "type": "json_object" });
        self
    }
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenRouterResponse {
    #[serde(default)]
    pub choices: Vec<OpenRouterChoice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenRouterChoice {
    pub message: OpenRouterMessage,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    context_length: u64,
}

impl OpenRouter {
    /// Create a new OpenRouter client
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::REFERER, REFERER)
            .header("X-Title", TITLE)
    }

    async fn post_completion(
        &self,
        request: &OpenRouterRequest,
    ) -> Result<Result<OpenRouterResponse, (StatusCode, String)>, ProviderError> {
        let url = openrouter_url(&self.base_url, "/chat/completions");
        let response = self
            .authorized(self.client.post(&url))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(Err((status, body)));
        }

        Ok(Ok(response.json::<OpenRouterResponse>().await?))
    }

    /// Send a completion, retrying once in JSON-object mode on HTTP 400
    pub async fn complete(&self, request: OpenRouterRequest) -> Result<OpenRouterResponse, ProviderError> {
        match self.post_completion(&request).await? {
            Ok(response) => Ok(response),
            Err((status, _)) if status == StatusCode::BAD_REQUEST => {
                warn!("OpenRouter rejected json_schema output; retrying with json_object");
                let fallback = request.with_json_object_format();
                self.post_completion(&fallback)
                    .await?
                    .map_err(|(status, body)| api_error("openrouter translate", status, body))
            }
            Err((status, body)) => Err(api_error("openrouter translate", status, body)),
        }
    }
}

fn api_error(context: &str, status: StatusCode, body: String) -> ProviderError {
    ProviderError::Api {
        status_code: status.as_u16(),
        message: format!("{}: {}; body: {}", context, status, body),
    }
}

#[async_trait]
impl Provider for OpenRouter {
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

        debug!("OpenRouter completion request: model={}", model);
        let request = OpenRouterRequest::new(
            model,
            &params.system_prompt,
            &params.user_prompt,
            params.temperature,
        );
        let response = self.complete(request).await?;

        let choice = response.choices.into_iter().next().ok_or(ProviderError::EmptyResult)?;
        let content = choice.message.content.trim().to_string();
        let translation = extract_translation(&content)?;

        Ok(TranslateResult { translation, raw: content })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = openrouter_url(&self.base_url, "/models");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error("openrouter list models", status, body));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models
            .data
            .into_iter()
            .map(|m| ModelInfo {
                description: if m.name.is_empty() { m.id.clone() } else { m.name },
                name: m.id,
                context_tokens: m.context_length,
            })
            .collect())
    }
}
