/*!
 * Single-unit translation.
 *
 * `TranslatorService::translate_one` masks protected tokens, consults the
 * cache, calls the provider with a bounded retry policy and checks that
 * every placeholder and tag survived before anything is cached.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::database::models::{ProviderRecord, TemplateScope, UnitRecord};
use crate::database::ports::ProviderStore;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{Provider, ProviderFactory, Segment, TranslateParams, TranslateResult};
use crate::translation::cache::{CacheKey, TranslationCache};
use crate::translation::masking::MaskedText;
use crate::translation::prompts::{PromptData, PromptRenderer, ROLE_SYSTEM, ROLE_USER, TRANSLATE_SINGLE};

/// Default number of provider attempts per unit
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts; attempt `n` waits `n * base`
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Everything needed to translate one unit into one locale
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    pub provider_id: i64,
    pub project_id: Option<i64>,
    pub unit: UnitRecord,
    pub source_lang: String,
    pub target_lang: String,
    /// Empty means the provider's default model
    pub model: String,
    /// Skip the cache lookup (the result is still cached)
    pub bypass_cache: bool,
    /// Literal system prompt instead of the rendered template
    pub system_override: Option<String>,
    /// Literal user prompt instead of the rendered template
    pub user_override: Option<String>,
    pub file_path: String,
    pub project_name: String,
}

impl TranslateRequest {
    pub fn new(provider_id: i64, unit: UnitRecord, target_lang: impl Into<String>) -> Self {
        Self {
            provider_id,
            project_id: None,
            unit,
            source_lang: String::new(),
            target_lang: target_lang.into(),
            model: String::new(),
            bypass_cache: false,
            system_override: None,
            user_override: None,
            file_path: String::new(),
            project_name: String::new(),
        }
    }
}

/// Per-unit translator
#[derive(Clone)]
pub struct TranslatorService {
    providers: Arc<dyn ProviderStore>,
    factory: Arc<dyn ProviderFactory>,
    prompts: Arc<dyn PromptRenderer>,
    cache: TranslationCache,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl TranslatorService {
    /// Create a translator with the default retry policy
    pub fn new(
        providers: Arc<dyn ProviderStore>,
        factory: Arc<dyn ProviderFactory>,
        prompts: Arc<dyn PromptRenderer>,
        cache: TranslationCache,
    ) -> Self {
        Self {
            providers,
            factory,
            prompts,
            cache,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = retry_backoff;
        self
    }

    /// Cache statistics as (hits, misses, hit rate)
    pub fn cache_stats(&self) -> (usize, usize, f64) {
        self.cache.stats()
    }

    /// Translate one unit into one locale and return the restored text
    pub async fn translate_one(&self, request: &TranslateRequest) -> Result<String, TranslationError> {
        let record = self
            .providers
            .get_provider(request.provider_id)
            .await
            .map_err(TranslationError::Storage)?
            .ok_or(TranslationError::ProviderNotFound(request.provider_id))?;

        let model = if request.model.is_empty() {
            record.model.clone()
        } else {
            request.model.clone()
        };

        let masked = MaskedText::new(&request.unit.source_text);

        let data = PromptData {
            src_lang: request.source_lang.clone(),
            tgt_lang: request.target_lang.clone(),
            key: request.unit.key.clone(),
            text: masked.masked.clone(),
            file_path: request.file_path.clone(),
            project: request.project_name.clone(),
            context: request.unit.context.clone(),
            placeholders: masked.placeholders.clone(),
            tags: masked.tags.clone(),
            project_id: request.project_id,
        };

        let system_prompt = self
            .prompt(request.system_override.as_deref(), &record, ROLE_SYSTEM, &data)
            .await?;
        let user_prompt = self
            .prompt(request.user_override.as_deref(), &record, ROLE_USER, &data)
            .await?;

        let key = CacheKey::new(
            &masked.masked,
            &request.source_lang,
            &request.target_lang,
            &record.kind.to_lowercase(),
            &model,
        );

        if !request.bypass_cache {
            if let Some(cached) = self.cache.get(&key).await {
                return Ok(masked.unmask(&cached));
            }
        }

        let provider = self.factory.build(&record)?;
        let segment = Segment {
            key: request.unit.key.clone(),
            text: masked.masked.clone(),
            context: request.unit.context.clone(),
            placeholders: masked.placeholders.clone(),
            tags: masked.tags.clone(),
        };
        let params = TranslateParams {
            source_lang: request.source_lang.clone(),
            target_lang: request.target_lang.clone(),
            model,
            temperature: 0.0,
            system_prompt,
            user_prompt,
        };

        let result = self.call_with_retry(provider.as_ref(), &segment, &params).await?;

        let translated = result.translation.trim();
        let restored = masked.unmask(translated);
        masked.verify(&restored)?;

        self.cache.store(&key, translated).await;
        Ok(restored)
    }

    async fn prompt(
        &self,
        literal: Option<&str>,
        record: &ProviderRecord,
        role: &str,
        data: &PromptData,
    ) -> Result<String, TranslationError> {
        match literal {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => self
                .prompts
                .render(TemplateScope::Provider, Some(record.id), TRANSLATE_SINGLE, role, data)
                .await
                .map_err(|e| TranslationError::Prompt(e.to_string())),
        }
    }

    async fn call_with_retry(
        &self,
        provider: &dyn Provider,
        segment: &Segment,
        params: &TranslateParams,
    ) -> Result<TranslateResult, ProviderError> {
        let mut attempt = 1;
        loop {
            match provider.translate(segment, params).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} for '{}' failed, retrying: {}",
                        attempt, self.max_attempts, segment.key, e
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Giving up on '{}' after {} attempt(s): {}", segment.key, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
