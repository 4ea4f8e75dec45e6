/*!
 * Error types for the locail application.
 *
 * Provider adapters surface typed `ProviderError`s so the translator can
 * decide retryability from the variant instead of the message text.
 * Storage and CLI plumbing stay on `anyhow`.
 */

use thiserror::Error;

/// Errors that can occur when talking to an LLM provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("API request failed: {0}")]
    Request(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason
        message: String,
    },

    /// The provider answered but returned no choices
    #[error("no choices returned")]
    EmptyResult,

    /// The model output could not be parsed as the expected structured output
    #[error("failed to parse translation JSON; content: {0}")]
    Parse(String),

    /// The stored provider type has no adapter
    #[error("unsupported provider: {0}")]
    Unsupported(String),

    /// The provider record is unusable (missing key, bad URL)
    #[error("provider configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Whether a fresh attempt at the same request may succeed.
    ///
    /// Models flake on output formatting, so empty or unparseable answers are
    /// retried. Transport, API and configuration failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::EmptyResult | ProviderError::Parse(_) => true,
            ProviderError::Request(_)
            | ProviderError::Api { .. }
            | ProviderError::Unsupported(_)
            | ProviderError::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ProviderError::Parse(error.to_string())
        } else {
            ProviderError::Request(error.to_string())
        }
    }
}

/// Errors that can occur while translating a single unit
#[derive(Error, Debug)]
pub enum TranslationError {
    /// No provider record with this id
    #[error("provider {0} not found")]
    ProviderNotFound(i64),

    /// Error from the provider adapter
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A source placeholder is absent from the translated output
    #[error("placeholder missing in translation: {0}")]
    MissingPlaceholder(String),

    /// A source inline tag is absent from the translated output
    #[error("tag missing in translation: {0}")]
    MissingTag(String),

    /// The prompt could not be rendered
    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    /// A repository call failed
    #[error("storage error: {0}")]
    Storage(anyhow::Error),

    /// The provider call did not finish in time
    #[error("translation timed out after {0}s")]
    Timeout(u64),
}

/// Errors raised while starting or managing a job
#[derive(Error, Debug)]
pub enum JobError {
    /// A repository call failed
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// Job parameters could not be serialized
    #[error("failed to serialize job parameters: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the job runner
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
