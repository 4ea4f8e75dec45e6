/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 * `Repository` implements every store port from `super::ports`.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use super::connection::DatabaseConnection;
use super::models::{
    CacheRecord, FileRecord, JobItemRecord, JobItemStatus, JobLogLevel, JobLogRecord, JobRecord,
    JobStatus, ProviderModelRecord, ProviderRecord, TemplateRecord, TemplateScope,
    TranslationRecord, TranslationStatus, UnitRecord,
};
use super::ports::{
    CacheStore, JobStore, ProviderStore, TemplateStore, TranslationStore, UnitStore,
};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    // =========================================================================
    // Row mappers
    // =========================================================================

    fn job_from_row(row: &Row) -> rusqlite::Result<JobRecord> {
        Ok(JobRecord {
            id: row.get(0)?,
            kind: parse_column(row, 1)?,
            status: parse_column(row, 2)?,
            project_id: row.get(3)?,
            provider_id: row.get(4)?,
            params_json: row.get(5)?,
            progress: row.get(6)?,
            total: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn item_from_row(row: &Row) -> rusqlite::Result<JobItemRecord> {
        Ok(JobItemRecord {
            id: row.get(0)?,
            job_id: row.get(1)?,
            unit_id: row.get(2)?,
            locale: row.get(3)?,
            status: parse_column(row, 4)?,
            error: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn log_from_row(row: &Row) -> rusqlite::Result<JobLogRecord> {
        Ok(JobLogRecord {
            id: row.get(0)?,
            job_id: row.get(1)?,
            ts: row.get(2)?,
            level: parse_column::<JobLogLevel>(row, 3)?,
            message: row.get(4)?,
        })
    }

    fn unit_from_row(row: &Row) -> rusqlite::Result<UnitRecord> {
        Ok(UnitRecord {
            id: row.get(0)?,
            file_id: row.get(1)?,
            key: row.get(2)?,
            source_text: row.get(3)?,
            context: row.get(4)?,
            metadata_json: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn translation_from_row(row: &Row) -> rusqlite::Result<TranslationRecord> {
        Ok(TranslationRecord {
            id: row.get(0)?,
            unit_id: row.get(1)?,
            locale: row.get(2)?,
            text: row.get(3)?,
            status: row
                .get::<_, String>(4)?
                .parse()
                .unwrap_or(TranslationStatus::Machine),
            provider_id: row.get(5)?,
            confidence: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn provider_from_row(row: &Row) -> rusqlite::Result<ProviderRecord> {
        Ok(ProviderRecord {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: row.get(2)?,
            base_url: row.get(3)?,
            model: row.get(4)?,
            api_key: row.get(5)?,
            options_json: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn get_unit_sync(conn: &Connection, unit_id: i64) -> Result<Option<UnitRecord>> {
        let unit = conn
            .query_row(
                r#"
                SELECT id, file_id, key, source_text, context, metadata_json, created_at
                FROM units WHERE id = ?1
                "#,
                [unit_id],
                Self::unit_from_row,
            )
            .optional()?;
        Ok(unit)
    }
}

/// Parse a TEXT column through `FromStr`, surfacing bad values as conversion errors
fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

const JOB_COLUMNS: &str =
    "id, type, status, project_id, provider_id, params_json, progress, total, created_at, updated_at";

#[async_trait]
impl JobStore for Repository {
    async fn create_job(&self, job: &JobRecord) -> Result<i64> {
        let job = job.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO jobs (
                        type, status, project_id, provider_id, params_json,
                        progress, total, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        job.kind.to_string(),
                        job.status.to_string(),
                        job.project_id,
                        job.provider_id,
                        job.params_json,
                        job.progress,
                        job.total,
                        job.created_at,
                        job.updated_at,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                debug!("Created job {} ({})", id, job.kind);
                Ok(id)
            })
            .await
    }

    async fn update_progress(
        &self,
        job_id: i64,
        done: i64,
        total: i64,
        status: JobStatus,
    ) -> Result<()> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE jobs SET progress = ?1, total = ?2, status = ?3, updated_at = ?4 WHERE id = ?5",
                    params![done, total, status.to_string(), Repository::now(), job_id],
                )?;
                Ok(())
            })
            .await
    }

    async fn add_item(&self, item: &JobItemRecord) -> Result<i64> {
        let item = item.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO job_items (job_id, unit_id, locale, status, error, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        item.job_id,
                        item.unit_id,
                        item.locale,
                        item.status.to_string(),
                        item.error,
                        item.created_at,
                        item.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn update_item(&self, item_id: i64, status: JobItemStatus, error: &str) -> Result<()> {
        let error = error.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE job_items SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4",
                    params![status.to_string(), error, Repository::now(), item_id],
                )?;
                Ok(())
            })
            .await
    }

    async fn add_log(&self, log: &JobLogRecord) -> Result<i64> {
        let log = log.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO job_logs (job_id, ts, level, message) VALUES (?1, ?2, ?3, ?4)",
                    params![log.job_id, log.ts, log.level.to_string(), log.message],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn get_job(&self, job_id: i64) -> Result<Option<JobRecord>> {
        self.db
            .execute_async(move |conn| {
                let job = conn
                    .query_row(
                        &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                        [job_id],
                        Repository::job_from_row,
                    )
                    .optional()?;
                Ok(job)
            })
            .await
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM jobs ORDER BY id DESC LIMIT ?1",
                    JOB_COLUMNS
                ))?;
                let jobs = stmt
                    .query_map([limit as i64], Repository::job_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(jobs)
            })
            .await
    }

    async fn list_items(&self, job_id: i64) -> Result<Vec<JobItemRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, job_id, unit_id, locale, status, error, created_at, updated_at
                    FROM job_items WHERE job_id = ?1 ORDER BY id
                    "#,
                )?;
                let items = stmt
                    .query_map([job_id], Repository::item_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(items)
            })
            .await
    }

    async fn list_logs(&self, job_id: i64, limit: usize) -> Result<Vec<JobLogRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, job_id, ts, level, message
                    FROM job_logs WHERE job_id = ?1 ORDER BY id LIMIT ?2
                    "#,
                )?;
                let logs = stmt
                    .query_map(params![job_id, limit as i64], Repository::log_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(logs)
            })
            .await
    }

    async fn delete_job(&self, job_id: i64) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM jobs WHERE id = ?1", [job_id])?;
                Ok(deleted > 0)
            })
            .await
    }
}

#[async_trait]
impl UnitStore for Repository {
    async fn list_units_by_file(&self, file_id: i64) -> Result<Vec<UnitRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, file_id, key, source_text, context, metadata_json, created_at
                    FROM units WHERE file_id = ?1 ORDER BY id
                    "#,
                )?;
                let units = stmt
                    .query_map([file_id], Repository::unit_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(units)
            })
            .await
    }

    async fn get_unit(&self, unit_id: i64) -> Result<Option<UnitRecord>> {
        self.db
            .execute_async(move |conn| Repository::get_unit_sync(conn, unit_id))
            .await
    }

    async fn create_file(&self, file: &FileRecord) -> Result<i64> {
        let file = file.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO files (project_id, path, format, locale, hash, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        file.project_id,
                        file.path,
                        file.format,
                        file.locale,
                        file.hash,
                        file.created_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>> {
        self.db
            .execute_async(move |conn| {
                let file = conn
                    .query_row(
                        r#"
                        SELECT id, project_id, path, format, locale, hash, created_at
                        FROM files WHERE id = ?1
                        "#,
                        [file_id],
                        |row| {
                            Ok(FileRecord {
                                id: row.get(0)?,
                                project_id: row.get(1)?,
                                path: row.get(2)?,
                                format: row.get(3)?,
                                locale: row.get(4)?,
                                hash: row.get(5)?,
                                created_at: row.get(6)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(file)
            })
            .await
    }

    async fn upsert_units(&self, units: Vec<UnitRecord>) -> Result<Vec<i64>> {
        self.db
            .transaction_async(move |tx| {
                let mut ids = Vec::with_capacity(units.len());
                {
                    let mut stmt = tx.prepare(
                        r#"
                        INSERT INTO units (file_id, key, source_text, context, metadata_json, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        ON CONFLICT(file_id, key) DO UPDATE SET
                            source_text = excluded.source_text,
                            context = excluded.context,
                            metadata_json = excluded.metadata_json
                        RETURNING id
                        "#,
                    )?;

                    for unit in &units {
                        let id: i64 = stmt.query_row(
                            params![
                                unit.file_id,
                                unit.key,
                                unit.source_text,
                                unit.context,
                                unit.metadata_json,
                                unit.created_at,
                            ],
                            |row| row.get(0),
                        )?;
                        ids.push(id);
                    }
                }
                debug!("Upserted {} units", ids.len());
                Ok(ids)
            })
            .await
    }
}

#[async_trait]
impl TranslationStore for Repository {
    async fn upsert_translation(&self, translation: &TranslationRecord) -> Result<()> {
        let tr = translation.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (
                        unit_id, locale, text, status, provider_id, confidence, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(unit_id, locale) DO UPDATE SET
                        text = excluded.text,
                        status = excluded.status,
                        provider_id = excluded.provider_id,
                        confidence = excluded.confidence,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        tr.unit_id,
                        tr.locale,
                        tr.text,
                        tr.status.to_string(),
                        tr.provider_id,
                        tr.confidence,
                        tr.created_at,
                        tr.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn get_translation(
        &self,
        unit_id: i64,
        locale: &str,
    ) -> Result<Option<TranslationRecord>> {
        let locale = locale.to_string();

        self.db
            .execute_async(move |conn| {
                let tr = conn
                    .query_row(
                        r#"
                        SELECT id, unit_id, locale, text, status, provider_id, confidence,
                               created_at, updated_at
                        FROM translations WHERE unit_id = ?1 AND locale = ?2
                        "#,
                        params![unit_id, locale],
                        Repository::translation_from_row,
                    )
                    .optional()?;
                Ok(tr)
            })
            .await
    }

    async fn list_translations_by_file_locale(
        &self,
        file_id: i64,
        locale: &str,
    ) -> Result<Vec<TranslationRecord>> {
        let locale = locale.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT t.id, t.unit_id, t.locale, t.text, t.status, t.provider_id,
                           t.confidence, t.created_at, t.updated_at
                    FROM translations t
                    JOIN units u ON u.id = t.unit_id
                    WHERE u.file_id = ?1 AND t.locale = ?2
                    ORDER BY u.id
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![file_id, locale], Repository::translation_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }
}

#[async_trait]
impl ProviderStore for Repository {
    async fn create_provider(&self, provider: &ProviderRecord) -> Result<i64> {
        let p = provider.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO providers (
                        type, name, base_url, model, api_key, options_json, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        p.kind,
                        p.name,
                        p.base_url,
                        p.model,
                        p.api_key,
                        p.options_json,
                        p.created_at,
                        p.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn get_provider(&self, provider_id: i64) -> Result<Option<ProviderRecord>> {
        self.db
            .execute_async(move |conn| {
                let p = conn
                    .query_row(
                        r#"
                        SELECT id, type, name, base_url, model, api_key, options_json,
                               created_at, updated_at
                        FROM providers WHERE id = ?1
                        "#,
                        [provider_id],
                        Repository::provider_from_row,
                    )
                    .optional()?;
                Ok(p)
            })
            .await
    }

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, type, name, base_url, model, api_key, options_json,
                           created_at, updated_at
                    FROM providers ORDER BY id
                    "#,
                )?;
                let providers = stmt
                    .query_map([], Repository::provider_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(providers)
            })
            .await
    }

    async fn delete_provider(&self, provider_id: i64) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM providers WHERE id = ?1", [provider_id])?;
                Ok(deleted > 0)
            })
            .await
    }

    async fn save_model_cache(&self, provider_id: i64, names: Vec<String>) -> Result<()> {
        self.db
            .transaction_async(move |tx| {
                tx.execute("DELETE FROM provider_models WHERE provider_id = ?1", [provider_id])?;
                let now = Repository::now();
                let mut stmt = tx.prepare(
                    r#"
                    INSERT OR IGNORE INTO provider_models (provider_id, name, updated_at)
                    VALUES (?1, ?2, ?3)
                    "#,
                )?;
                for name in &names {
                    stmt.execute(params![provider_id, name, now])?;
                }
                debug!("Cached {} models for provider {}", names.len(), provider_id);
                Ok(())
            })
            .await
    }

    async fn list_model_cache(&self, provider_id: i64) -> Result<Vec<ProviderModelRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, provider_id, name, updated_at
                    FROM provider_models WHERE provider_id = ?1 ORDER BY name
                    "#,
                )?;
                let models = stmt
                    .query_map([provider_id], |row| {
                        Ok(ProviderModelRecord {
                            id: row.get(0)?,
                            provider_id: row.get(1)?,
                            name: row.get(2)?,
                            updated_at: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(models)
            })
            .await
    }
}

#[async_trait]
impl CacheStore for Repository {
    async fn get_cached(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        provider: &str,
        model: &str,
    ) -> Result<Option<CacheRecord>> {
        let source_text_hash = Self::hash_text(source_text);
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();
        let provider = provider.to_string();
        let model = model.to_string();

        self.db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        r#"
                        SELECT source_text, source_language, target_language, provider, model,
                               translated_text, created_at
                        FROM translation_cache
                        WHERE source_text_hash = ?1
                          AND source_language = ?2
                          AND target_language = ?3
                          AND provider = ?4
                          AND model = ?5
                        "#,
                        params![source_text_hash, source_language, target_language, provider, model],
                        |row| {
                            Ok(CacheRecord {
                                source_text: row.get(0)?,
                                source_language: row.get(1)?,
                                target_language: row.get(2)?,
                                provider: row.get(3)?,
                                model: row.get(4)?,
                                translation: row.get(5)?,
                                created_at: row.get(6)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }

    async fn put_cached(&self, record: &CacheRecord) -> Result<()> {
        let record = record.clone();
        let source_text_hash = Self::hash_text(&record.source_text);

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translation_cache (
                        source_text_hash, source_text, source_language, target_language,
                        provider, model, translated_text, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(source_text_hash, source_language, target_language, provider, model)
                    DO UPDATE SET translated_text = excluded.translated_text,
                                  created_at = excluded.created_at
                    "#,
                    params![
                        source_text_hash,
                        record.source_text,
                        record.source_language,
                        record.target_language,
                        record.provider,
                        record.model,
                        record.translation,
                        record.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl TemplateStore for Repository {
    async fn get_effective_template(
        &self,
        scope: TemplateScope,
        ref_id: Option<i64>,
        template_type: &str,
        role: &str,
    ) -> Result<Option<TemplateRecord>> {
        let template_type = template_type.to_string();
        let role = role.to_string();
        let stored_ref = ref_id.unwrap_or(0);

        self.db
            .execute_async(move |conn| {
                let template = conn
                    .query_row(
                        r#"
                        SELECT id, scope, ref_id, type, role, body, is_default, updated_at
                        FROM templates
                        WHERE scope = ?1 AND ref_id = ?2 AND type = ?3 AND role = ?4
                        "#,
                        params![scope.to_string(), stored_ref, template_type, role],
                        |row| {
                            let ref_id: i64 = row.get(2)?;
                            Ok(TemplateRecord {
                                id: row.get(0)?,
                                scope: parse_column(row, 1)?,
                                ref_id: (ref_id != 0).then_some(ref_id),
                                template_type: row.get(3)?,
                                role: row.get(4)?,
                                body: row.get(5)?,
                                is_default: row.get(6)?,
                                updated_at: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(template)
            })
            .await
    }

    async fn upsert_template(&self, template: &TemplateRecord) -> Result<()> {
        let t = template.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO templates (scope, ref_id, type, role, body, is_default, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(scope, ref_id, type, role) DO UPDATE SET
                        body = excluded.body,
                        is_default = excluded.is_default,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        t.scope.to_string(),
                        t.ref_id.unwrap_or(0),
                        t.template_type,
                        t.role,
                        t.body,
                        t.is_default,
                        t.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }
}
