/*!
 * Translation caching functionality.
 *
 * This module wraps a persistent `CacheStore` to avoid redundant provider
 * calls. Entries are keyed by the masked source text, both languages, the
 * provider kind and the model, and never expire.
 */

use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::database::models::CacheRecord;
use crate::database::ports::CacheStore;

/// Composite cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Masked source text
    pub source_text: String,
    pub source_language: String,
    pub target_language: String,
    /// Provider kind tag
    pub provider: String,
    pub model: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(
        source_text: &str,
        source_language: &str,
        target_language: &str,
        provider: &str,
        model: &str,
    ) -> Self {
        Self {
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
        }
    }
}

/// Translation cache for storing and retrieving translations
#[derive(Clone)]
pub struct TranslationCache {
    store: Arc<dyn CacheStore>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl TranslationCache {
    /// Create a new translation cache over a store
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a translation from the cache; read failures count as misses
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let result = self
            .store
            .get_cached(
                &key.source_text,
                &key.source_language,
                &key.target_language,
                &key.provider,
                &key.model,
            )
            .await;

        match result {
            Ok(Some(record)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache hit for '{}' ({} -> {}, {}/{})",
                    truncate_text(&key.source_text, 30),
                    key.source_language,
                    key.target_language,
                    key.provider,
                    key.model
                );
                Some(record.translation)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache miss for '{}' ({} -> {})",
                    truncate_text(&key.source_text, 30),
                    key.source_language,
                    key.target_language
                );
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!("Cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store a translation in the cache; write failures are logged and ignored
    pub async fn store(&self, key: &CacheKey, translation: &str) {
        let record = CacheRecord::new(
            key.source_text.clone(),
            key.source_language.clone(),
            key.target_language.clone(),
            key.provider.clone(),
            key.model.clone(),
            translation.to_string(),
        );

        match self.store.put_cached(&record).await {
            Ok(()) => debug!(
                "Cached translation for '{}' ({} -> {})",
                truncate_text(&key.source_text, 30),
                key.source_language,
                key.target_language
            ),
            Err(e) => warn!("Failed to write translation cache: {}", e),
        }
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }
}

/// Truncate text for logging purposes
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_length).collect::<String>())
    }
}
