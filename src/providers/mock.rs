/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with an echoed translation
 * - `MockProvider::failing()` - Always fails with a non-retryable API error
 * - `MockProvider::unparseable()` - Always fails with a retryable parse error
 *
 * A script of queued outcomes can be layered on top; once it runs dry the
 * base behavior answers. Clones share the request counter and the script.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::database::models::ProviderRecord;
use crate::errors::ProviderError;
use crate::providers::{
    ModelInfo, Provider, ProviderFactory, ProviderKind, Segment, TranslateParams, TranslateResult,
};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds, echoing the masked text with a target prefix
    Working,
    /// Always fails with an API error
    Failing,
    /// Returns content that cannot be parsed
    Unparseable,
    /// Returns no choices
    Empty,
    /// Succeeds after a delay (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior once the script is exhausted
    behavior: MockBehavior,
    /// Request counter shared across clones
    request_count: Arc<AtomicUsize>,
    /// Queued outcomes consumed in order
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Parameters of every translate call
    requests: Arc<Mutex<Vec<TranslateParams>>>,
    /// Models reported by `list_models`
    models: Vec<ModelInfo>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&Segment, &TranslateParams) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            models: Vec::new(),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock whose output never parses
    pub fn unparseable() -> Self {
        Self::new(MockBehavior::Unparseable)
    }

    /// Create a mock that returns no choices
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Queue outcomes returned before the base behavior kicks in
    pub fn with_script(self, outcomes: Vec<Result<String, ProviderError>>) -> Self {
        self.script.lock().extend(outcomes);
        self
    }

    /// Set the models reported by `list_models`
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&Segment, &TranslateParams) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Parameters of every translate call, in order
    pub fn requests(&self) -> Vec<TranslateParams> {
        self.requests.lock().clone()
    }

    fn echo(&self, segment: &Segment, params: &TranslateParams) -> String {
        match self.custom_response {
            Some(generator) => generator(segment, params),
            None => format!("[TRANSLATED to {}] {}", params.target_lang, segment.text),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn translate(
        &self,
        segment: &Segment,
        params: &TranslateParams,
    ) -> Result<TranslateResult, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(params.clone());

        let scripted = self.script.lock().pop_front();
        let translation = match scripted {
            Some(outcome) => outcome?,
            None => match self.behavior {
                MockBehavior::Working => self.echo(segment, params),
                MockBehavior::Failing => {
                    return Err(ProviderError::Api {
                        status_code: 500,
                        message: "Simulated provider failure".to_string(),
                    })
                }
                MockBehavior::Unparseable => {
                    return Err(ProviderError::Parse("not json at all {".to_string()))
                }
                MockBehavior::Empty => return Err(ProviderError::EmptyResult),
                MockBehavior::Slow { delay_ms } => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    self.echo(segment, params)
                }
            },
        };

        Ok(TranslateResult { raw: translation.clone(), translation })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        if self.behavior == MockBehavior::Failing {
            return Err(ProviderError::Request("connection refused".to_string()));
        }
        Ok(self.models.clone())
    }
}

/// Factory handing out clones of one mock provider
#[derive(Debug, Clone)]
pub struct MockProviderFactory {
    provider: MockProvider,
}

impl MockProviderFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self { provider }
    }

    /// The shared provider, for inspecting counters
    pub fn provider(&self) -> &MockProvider {
        &self.provider
    }
}

impl ProviderFactory for MockProviderFactory {
    fn build(&self, record: &ProviderRecord) -> Result<Arc<dyn Provider>, ProviderError> {
        // Unknown kinds fail the same way as with the real factory
        record.kind.parse::<ProviderKind>()?;
        Ok(Arc::new(self.provider.clone()))
    }
}
