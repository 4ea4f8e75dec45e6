/*!
 * # locail - Localization files translated with AI
 *
 * A Rust library that translates imported localization units with LLM
 * providers, running each request as a tracked, cancelable background job.
 *
 * ## Features
 *
 * - Translate units using various AI providers:
 *   - Ollama (local LLM)
 *   - OpenRouter API
 * - Protect placeholders (`{name}`) and inline tags (`<b>`) across translation
 * - Content-addressed translation cache
 * - Prompt templates overridable per provider, project or globally
 * - Background jobs with progress events, per-item logs and cancellation
 * - ISO 639-1 and ISO 639-2 locale support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite persistence and the storage ports
 * - `translation`: Single-unit translation:
 *   - `translation::masking`: Placeholder and tag protection
 *   - `translation::cache`: Translation cache
 *   - `translation::prompts`: Prompt templates
 *   - `translation::service`: Retry and integrity checks
 * - `jobs`: Background jobs, events and cancellation
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for LLM providers:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::openrouter`: OpenRouter API client
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod jobs;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, JobConfig};
pub use database::Repository;
pub use errors::{AppError, JobError, ProviderError, TranslationError};
pub use jobs::{JobEvent, JobRunner};
pub use language_utils::{display_name, get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::TranslatorService;
