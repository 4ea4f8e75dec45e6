/*!
 * Storage ports consumed by the translator and the job runner.
 *
 * Each trait covers one concern so tests can swap a single store without
 * faking the rest. `Repository` implements all of them over SQLite.
 */

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    CacheRecord, FileRecord, JobItemRecord, JobItemStatus, JobLogRecord, JobRecord, JobStatus,
    ProviderModelRecord, ProviderRecord, TemplateRecord, TemplateScope, TranslationRecord,
    UnitRecord,
};

/// Job, job item and job log persistence
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a job and return its id
    async fn create_job(&self, job: &JobRecord) -> Result<i64>;

    /// Persist progress, total and status in one write
    async fn update_progress(
        &self,
        job_id: i64,
        done: i64,
        total: i64,
        status: JobStatus,
    ) -> Result<()>;

    /// Insert a job item and return its id
    async fn add_item(&self, item: &JobItemRecord) -> Result<i64>;

    async fn update_item(&self, item_id: i64, status: JobItemStatus, error: &str) -> Result<()>;

    async fn add_log(&self, log: &JobLogRecord) -> Result<i64>;

    async fn get_job(&self, job_id: i64) -> Result<Option<JobRecord>>;

    /// Most recent jobs first
    async fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>>;

    async fn list_items(&self, job_id: i64) -> Result<Vec<JobItemRecord>>;

    /// Oldest lines first, capped at `limit`
    async fn list_logs(&self, job_id: i64, limit: usize) -> Result<Vec<JobLogRecord>>;

    /// Delete a job together with its items and logs
    async fn delete_job(&self, job_id: i64) -> Result<bool>;
}

/// Read access to imported units, plus seeding helpers
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// Units of a file ordered by id
    async fn list_units_by_file(&self, file_id: i64) -> Result<Vec<UnitRecord>>;

    async fn get_unit(&self, unit_id: i64) -> Result<Option<UnitRecord>>;

    async fn create_file(&self, file: &FileRecord) -> Result<i64>;

    async fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>>;

    /// Insert or update units by (file_id, key); returns their ids in input order
    async fn upsert_units(&self, units: Vec<UnitRecord>) -> Result<Vec<i64>>;
}

/// Live translations keyed by (unit, locale)
#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn upsert_translation(&self, translation: &TranslationRecord) -> Result<()>;

    async fn get_translation(&self, unit_id: i64, locale: &str)
        -> Result<Option<TranslationRecord>>;

    async fn list_translations_by_file_locale(
        &self,
        file_id: i64,
        locale: &str,
    ) -> Result<Vec<TranslationRecord>>;
}

/// Provider configuration and model listing cache
#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn create_provider(&self, provider: &ProviderRecord) -> Result<i64>;

    async fn get_provider(&self, provider_id: i64) -> Result<Option<ProviderRecord>>;

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>>;

    async fn delete_provider(&self, provider_id: i64) -> Result<bool>;

    /// Replace the cached model list of a provider
    async fn save_model_cache(&self, provider_id: i64, names: Vec<String>) -> Result<()>;

    async fn list_model_cache(&self, provider_id: i64) -> Result<Vec<ProviderModelRecord>>;
}

/// Content-addressed translation cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_cached(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        provider: &str,
        model: &str,
    ) -> Result<Option<CacheRecord>>;

    /// Insert or overwrite by composite key
    async fn put_cached(&self, record: &CacheRecord) -> Result<()>;
}

/// Prompt template storage
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Exact lookup of the template stored for one scope
    async fn get_effective_template(
        &self,
        scope: TemplateScope,
        ref_id: Option<i64>,
        template_type: &str,
        role: &str,
    ) -> Result<Option<TemplateRecord>>;

    async fn upsert_template(&self, template: &TemplateRecord) -> Result<()>;
}
