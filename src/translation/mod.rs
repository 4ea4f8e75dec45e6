/*!
 * Translation of localization units using AI providers.
 *
 * This module is split into several submodules:
 *
 * - `masking`: Placeholder and tag protection
 * - `cache`: Content-addressed translation cache
 * - `prompts`: Prompt templates and rendering
 * - `service`: Single-unit translation with retry and integrity checks
 */

pub mod cache;
pub mod masking;
pub mod prompts;
pub mod service;

// Re-export main types for easier usage
pub use self::cache::{CacheKey, TranslationCache};
pub use self::masking::{extract_placeholders, extract_tags, MaskedText};
pub use self::prompts::{PromptData, PromptRenderer, TemplatePromptRenderer};
pub use self::service::{TranslateRequest, TranslatorService};
