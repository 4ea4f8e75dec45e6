/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - Ollama: Local LLM server
 * - OpenRouter: Hosted model router with an OpenAI-compatible API
 *
 * Stored provider records are turned into trait objects by `build_provider`,
 * which dispatches on the closed `ProviderKind` enum.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use crate::database::models::ProviderRecord;
use crate::errors::ProviderError;

pub mod mock;
pub mod ollama;
pub mod openrouter;
pub mod response;

/// HTTP client timeout for every provider request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The unit of text handed to a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    pub key: String,
    /// Masked source text
    pub text: String,
    pub context: String,
    pub placeholders: Vec<String>,
    pub tags: Vec<String>,
}

/// Per-call request parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslateParams {
    pub source_lang: String,
    pub target_lang: String,
    /// Empty means the provider's configured default
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Provider answer: extracted translation plus the raw content it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateResult {
    pub translation: String,
    pub raw: String,
}

/// Model advertised by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Canonical model id
    pub name: String,
    /// Human-readable label
    pub description: String,
    pub context_tokens: u64,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate one segment using the prompts in `params`
    async fn translate(
        &self,
        segment: &Segment,
        params: &TranslateParams,
    ) -> Result<TranslateResult, ProviderError>;

    /// List the models the provider currently offers
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.list_models().await.map(|_| ())
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenRouter,
}

impl ProviderKind {
    /// Tag stored in the database and used in cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    /// Base URL used when the record leaves it empty
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => ollama::DEFAULT_BASE_URL,
            ProviderKind::OpenRouter => openrouter::DEFAULT_BASE_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            _ => Err(ProviderError::Unsupported(s.to_string())),
        }
    }
}

/// Build a provider client from a stored record
pub fn build_provider(record: &ProviderRecord) -> Result<Arc<dyn Provider>, ProviderError> {
    let kind: ProviderKind = record.kind.parse()?;
    let base_url = if record.base_url.trim().is_empty() {
        kind.default_base_url().to_string()
    } else {
        record.base_url.trim().to_string()
    };

    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::Ollama => Arc::new(ollama::Ollama::new(base_url, record.model.clone())?),
        ProviderKind::OpenRouter => Arc::new(openrouter::OpenRouter::new(
            base_url,
            record.api_key.clone(),
            record.model.clone(),
        )?),
    };

    Ok(provider)
}

/// Source of provider clients; swapped for scripted providers in tests
pub trait ProviderFactory: Send + Sync {
    fn build(&self, record: &ProviderRecord) -> Result<Arc<dyn Provider>, ProviderError>;
}

/// Factory backed by the real HTTP adapters
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProviderFactory;

impl ProviderFactory for DefaultProviderFactory {
    fn build(&self, record: &ProviderRecord) -> Result<Arc<dyn Provider>, ProviderError> {
        build_provider(record)
    }
}

/// Build the shared reqwest client used by the adapters
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Configuration(format!("failed to build HTTP client: {}", e)))
}
