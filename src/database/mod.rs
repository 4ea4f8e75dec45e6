/*!
 * Database module for persistent storage of jobs and translations.
 *
 * This module provides SQLite-based persistence for:
 * - Jobs with their items and logs
 * - Imported files, units and their translations
 * - Provider configuration and prompt templates
 * - Translation cache for cross-job deduplication
 */

pub mod connection;
pub mod models;
pub mod ports;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use ports::{CacheStore, JobStore, ProviderStore, TemplateStore, TranslationStore, UnitStore};
pub use repository::Repository;
