/*!
 * Background translation jobs.
 *
 * Every `start_*` call persists a job, spawns one task that walks its
 * (unit, locale) pairs in order and returns the job id right away. The task
 * is the only writer of the job's terminal status.
 */

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::JobConfig;
use crate::database::models::{
    JobItemRecord, JobItemStatus, JobKind, JobLogLevel, JobLogRecord, JobRecord, JobStatus,
    ProviderRecord, TranslationRecord, UnitRecord,
};
use crate::database::ports::{JobStore, ProviderStore, TranslationStore, UnitStore};
use crate::database::Repository;
use crate::errors::{JobError, ProviderError, TranslationError};
use crate::jobs::events::{EventSink, JobEvent, NoopSink};
use crate::jobs::params::{TranslateFileParams, TranslateUnitParams, TranslateUnitsParams};
use crate::jobs::registry::CancellationRegistry;
use crate::providers::ProviderFactory;
use crate::translation::{TemplatePromptRenderer, TranslateRequest, TranslationCache, TranslatorService};

/// What a job task walks over
#[derive(Debug, Clone)]
enum WorkPlan {
    /// All units of a file; locales that already have text are skipped
    File { file_id: i64, locales: Vec<String> },
    /// One unit; locales were filtered when the job started
    Unit { unit_id: i64, locales: Vec<String>, force: bool },
    /// Explicit units; unloadable ones are skipped
    Units { unit_ids: Vec<i64>, locales: Vec<String>, force: bool },
}

impl WorkPlan {
    fn locales(&self) -> &[String] {
        match self {
            WorkPlan::File { locales, .. }
            | WorkPlan::Unit { locales, .. }
            | WorkPlan::Units { locales, .. } => locales,
        }
    }

    /// Whether existing translations are skipped while running
    fn skips_existing(&self) -> bool {
        match self {
            WorkPlan::File { .. } => true,
            WorkPlan::Unit { .. } => false,
            WorkPlan::Units { force, .. } => !force,
        }
    }

    fn bypass_cache(&self) -> bool {
        match self {
            WorkPlan::File { .. } => false,
            WorkPlan::Unit { force, .. } | WorkPlan::Units { force, .. } => *force,
        }
    }
}

/// Identity of a running job, shared by every item it processes
#[derive(Debug, Clone)]
struct JobContext {
    job_id: i64,
    project_id: i64,
    provider_id: i64,
    model: String,
    total: i64,
}

/// Starts, tracks and cancels translation jobs
#[derive(Clone)]
pub struct JobRunner {
    jobs: Arc<dyn JobStore>,
    units: Arc<dyn UnitStore>,
    translations: Arc<dyn TranslationStore>,
    providers: Arc<dyn ProviderStore>,
    factory: Arc<dyn ProviderFactory>,
    translator: TranslatorService,
    config: JobConfig,
    source_language: String,
    events: Arc<dyn EventSink>,
    registry: CancellationRegistry,
}

impl JobRunner {
    /// Create a runner over a store implementing every job-side port
    pub fn new<S>(
        store: Arc<S>,
        factory: Arc<dyn ProviderFactory>,
        translator: TranslatorService,
        config: JobConfig,
    ) -> Self
    where
        S: JobStore + UnitStore + TranslationStore + ProviderStore + 'static,
    {
        Self {
            jobs: store.clone(),
            units: store.clone(),
            translations: store.clone(),
            providers: store,
            factory,
            translator,
            config,
            source_language: String::new(),
            events: Arc::new(NoopSink),
            registry: CancellationRegistry::new(),
        }
    }

    /// Wire a runner and its translator over one SQLite repository
    pub fn from_repository(
        repo: Arc<Repository>,
        factory: Arc<dyn ProviderFactory>,
        config: JobConfig,
    ) -> Self {
        let translator = TranslatorService::new(
            repo.clone(),
            factory.clone(),
            Arc::new(TemplatePromptRenderer::new(repo.clone())),
            TranslationCache::new(repo.clone()),
        )
        .with_retry_policy(config.max_attempts, Duration::from_millis(config.retry_backoff_ms));

        Self::new(repo, factory, translator, config)
    }

    /// Read units from a different store than the one the runner was built over
    pub fn with_unit_store(mut self, units: Arc<dyn UnitStore>) -> Self {
        self.units = units;
        self
    }

    /// Read and write translations through a different store
    pub fn with_translation_store(mut self, translations: Arc<dyn TranslationStore>) -> Self {
        self.translations = translations;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Source language passed to prompts; empty means unspecified
    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = language.into();
        self
    }

    /// Handle that can cancel or await this runner's jobs from elsewhere
    pub fn canceller(&self) -> CancellationRegistry {
        self.registry.clone()
    }

    /// Translate every unit of a file into the target locales
    pub async fn start_translate_file(
        &self,
        project_id: i64,
        provider_id: i64,
        mut params: TranslateFileParams,
    ) -> Result<i64, JobError> {
        params.model = self.resolve_model(provider_id, &params.model).await;

        let units = match self.units.list_units_by_file(params.file_id).await {
            Ok(units) => units,
            Err(e) => {
                warn!("Could not list units of file {}: {}", params.file_id, e);
                Vec::new()
            }
        };

        let mut total = 0;
        for locale in &params.target_locales {
            let existing = match self
                .translations
                .list_translations_by_file_locale(params.file_id, locale)
                .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    warn!("Could not list {} translations of file {}: {}", locale, params.file_id, e);
                    Vec::new()
                }
            };
            let translated: HashSet<i64> = existing
                .into_iter()
                .filter(|t| t.has_text())
                .map(|t| t.unit_id)
                .collect();
            total += units.iter().filter(|u| !translated.contains(&u.id)).count() as i64;
        }

        let message = format!(
            "job started: provider={} model={} units={} locales={}",
            provider_id,
            params.model,
            units.len(),
            params.target_locales.len()
        );
        let plan = WorkPlan::File {
            file_id: params.file_id,
            locales: params.target_locales.clone(),
        };
        let params_json = serde_json::to_string(&params)?;

        self.launch(JobKind::TranslateFile, project_id, provider_id, params.model, params_json, total, plan, message)
            .await
    }

    /// Translate one unit into the given locales
    pub async fn start_translate_unit(
        &self,
        project_id: i64,
        provider_id: i64,
        mut params: TranslateUnitParams,
    ) -> Result<i64, JobError> {
        params.model = self.resolve_model(provider_id, &params.model).await;

        let locales = if params.force {
            params.locales.clone()
        } else {
            let mut missing = Vec::with_capacity(params.locales.len());
            for locale in &params.locales {
                if !self.has_translation(params.unit_id, locale).await {
                    missing.push(locale.clone());
                }
            }
            missing
        };

        let message = format!(
            "job started: provider={} model={} unit={} locales={}",
            provider_id,
            params.model,
            params.unit_id,
            locales.len()
        );
        let total = locales.len() as i64;
        let plan = WorkPlan::Unit {
            unit_id: params.unit_id,
            locales,
            force: params.force,
        };
        let params_json = serde_json::to_string(&params)?;

        self.launch(JobKind::TranslateUnit, project_id, provider_id, params.model, params_json, total, plan, message)
            .await
    }

    /// Translate a list of units into the given locales, unit by unit
    pub async fn start_translate_units(
        &self,
        project_id: i64,
        provider_id: i64,
        mut params: TranslateUnitsParams,
    ) -> Result<i64, JobError> {
        params.model = self.resolve_model(provider_id, &params.model).await;

        let total = if params.force {
            (params.unit_ids.len() * params.locales.len()) as i64
        } else {
            let mut missing = 0;
            for unit_id in &params.unit_ids {
                for locale in &params.locales {
                    if !self.has_translation(*unit_id, locale).await {
                        missing += 1;
                    }
                }
            }
            missing
        };

        let message = format!(
            "job started: provider={} model={} units={} locales={}",
            provider_id,
            params.model,
            params.unit_ids.len(),
            params.locales.len()
        );
        let plan = WorkPlan::Units {
            unit_ids: params.unit_ids.clone(),
            locales: params.locales.clone(),
            force: params.force,
        };
        let params_json = serde_json::to_string(&params)?;

        self.launch(JobKind::TranslateUnits, project_id, provider_id, params.model, params_json, total, plan, message)
            .await
    }

    /// Request cancellation; false when the job is not running here
    pub fn cancel(&self, job_id: i64) -> bool {
        let found = self.registry.cancel(job_id);
        if found {
            info!("Cancellation requested for job {}", job_id);
        }
        found
    }

    pub fn is_active(&self, job_id: i64) -> bool {
        self.registry.is_active(job_id)
    }

    /// Wait for the job's task to end; returns at once for unknown jobs
    pub async fn wait(&self, job_id: i64) {
        self.registry.wait(job_id).await;
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Option<JobRecord>, JobError> {
        Ok(self.jobs.get_job(job_id).await?)
    }

    pub async fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, JobError> {
        Ok(self.jobs.list_jobs(limit).await?)
    }

    pub async fn list_items(&self, job_id: i64) -> Result<Vec<JobItemRecord>, JobError> {
        Ok(self.jobs.list_items(job_id).await?)
    }

    pub async fn list_logs(&self, job_id: i64, limit: usize) -> Result<Vec<JobLogRecord>, JobError> {
        Ok(self.jobs.list_logs(job_id, limit).await?)
    }

    /// Delete a job with its items and logs once its task has stopped
    pub async fn delete_job(&self, job_id: i64) -> Result<bool, JobError> {
        self.cancel(job_id);
        self.wait(job_id).await;
        Ok(self.jobs.delete_job(job_id).await?)
    }

    /// Persist the job, announce it and spawn its task
    #[allow(clippy::too_many_arguments)]
    async fn launch(
        &self,
        kind: JobKind,
        project_id: i64,
        provider_id: i64,
        model: String,
        params_json: String,
        total: i64,
        plan: WorkPlan,
        start_message: String,
    ) -> Result<i64, JobError> {
        let record = JobRecord::new(kind, Some(project_id), Some(provider_id), params_json, total);
        let job_id = self.jobs.create_job(&record).await?;
        self.jobs.update_progress(job_id, 0, total, JobStatus::Running).await?;

        self.emit(JobEvent::Started {
            job_id,
            total,
            model: model.clone(),
            provider_id,
        });
        self.job_log(job_id, JobLogLevel::Info, start_message).await;
        info!("Started {} job {} ({} items)", kind, job_id, total);

        let ctx = JobContext {
            job_id,
            project_id,
            provider_id,
            model,
            total,
        };
        let token = self.registry.register(job_id);
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run(ctx, plan, token).await;
            runner.registry.finish(job_id);
        });

        Ok(job_id)
    }

    async fn run(&self, ctx: JobContext, plan: WorkPlan, token: CancellationToken) {
        let units = match self.load_units(&plan).await {
            Ok(units) => units,
            Err(message) => {
                self.job_log(ctx.job_id, JobLogLevel::Error, message).await;
                let failed = JobContext { total: 0, ..ctx };
                self.finish(&failed, 0, JobStatus::Failed).await;
                warn!("Job {} failed during setup", failed.job_id);
                return;
            }
        };

        let mut file_paths: HashMap<i64, String> = HashMap::new();
        let mut done = 0;

        for unit in &units {
            for locale in plan.locales() {
                if token.is_cancelled() {
                    self.finish(&ctx, done, JobStatus::Canceled).await;
                    info!("Job {} canceled after {} item(s)", ctx.job_id, done);
                    return;
                }

                if plan.skips_existing() && self.has_translation(unit.id, locale).await {
                    continue;
                }

                let file_path = self.file_path(unit.file_id, &mut file_paths).await;
                self.process_item(&ctx, unit, locale, file_path, plan.bypass_cache())
                    .await;

                done += 1;
                self.persist_progress(ctx.job_id, done, ctx.total, JobStatus::Running).await;
                self.emit(JobEvent::Progress {
                    job_id: ctx.job_id,
                    done,
                    total: ctx.total,
                    status: JobStatus::Running,
                    model: ctx.model.clone(),
                });
            }
        }

        self.finish(&ctx, done, JobStatus::Done).await;
        info!("Job {} finished: {}/{} item(s)", ctx.job_id, done, ctx.total);
    }

    /// Units to walk, or the message explaining why the job cannot run
    async fn load_units(&self, plan: &WorkPlan) -> Result<Vec<UnitRecord>, String> {
        match plan {
            WorkPlan::File { file_id, .. } => self
                .units
                .list_units_by_file(*file_id)
                .await
                .map_err(|e| e.to_string()),
            WorkPlan::Unit { unit_id, .. } => match self.units.get_unit(*unit_id).await {
                Ok(Some(unit)) => Ok(vec![unit]),
                Ok(None) => Err(format!("unit {} not found", unit_id)),
                Err(e) => Err(e.to_string()),
            },
            WorkPlan::Units { unit_ids, .. } => {
                let mut units = Vec::with_capacity(unit_ids.len());
                for unit_id in unit_ids {
                    match self.units.get_unit(*unit_id).await {
                        Ok(Some(unit)) => units.push(unit),
                        Ok(None) => debug!("Skipping missing unit {}", unit_id),
                        Err(e) => debug!("Skipping unit {}: {}", unit_id, e),
                    }
                }
                Ok(units)
            }
        }
    }

    async fn process_item(
        &self,
        ctx: &JobContext,
        unit: &UnitRecord,
        locale: &str,
        file_path: String,
        bypass_cache: bool,
    ) {
        let item_id = match self
            .jobs
            .add_item(&JobItemRecord::running(ctx.job_id, unit.id, locale))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Could not record item for job {}: {}", ctx.job_id, e);
                None
            }
        };
        self.emit(JobEvent::ItemStart {
            job_id: ctx.job_id,
            unit_id: unit.id,
            key: unit.key.clone(),
            locale: locale.to_string(),
            model: ctx.model.clone(),
        });
        self.job_log(
            ctx.job_id,
            JobLogLevel::Info,
            format!("translate start: key={} locale={} model={}", unit.key, locale, ctx.model),
        )
        .await;

        let mut request = TranslateRequest::new(ctx.provider_id, unit.clone(), locale);
        request.project_id = Some(ctx.project_id);
        request.source_lang = self.source_language.clone();
        request.model = ctx.model.clone();
        request.bypass_cache = bypass_cache;
        request.file_path = file_path;

        match self.translate_with_timeout(&request).await {
            Ok(text) => {
                let translation =
                    TranslationRecord::machine(unit.id, locale, &text, Some(ctx.provider_id));
                if let Err(e) = self.translations.upsert_translation(&translation).await {
                    warn!("Could not save translation of '{}' ({}): {}", unit.key, locale, e);
                }
                if let Some(item_id) = item_id {
                    self.persist_item(item_id, JobItemStatus::Done, "").await;
                }
                self.emit(JobEvent::ItemDone {
                    job_id: ctx.job_id,
                    unit_id: unit.id,
                    key: unit.key.clone(),
                    locale: locale.to_string(),
                    text: Some(text.clone()),
                    error: None,
                    model: ctx.model.clone(),
                });
                self.job_log(
                    ctx.job_id,
                    JobLogLevel::Info,
                    format!("translate done: key={} locale={} len={}", unit.key, locale, text.len()),
                )
                .await;
            }
            Err(err) => {
                let error = err.to_string();
                if let Some(item_id) = item_id {
                    self.persist_item(item_id, JobItemStatus::Failed, &error).await;
                }
                self.job_log(
                    ctx.job_id,
                    JobLogLevel::Error,
                    format!("{} -> {}: {}", unit.key, locale, error),
                )
                .await;
                self.emit(JobEvent::ItemDone {
                    job_id: ctx.job_id,
                    unit_id: unit.id,
                    key: unit.key.clone(),
                    locale: locale.to_string(),
                    text: None,
                    error: Some(error),
                    model: ctx.model.clone(),
                });
            }
        }
    }

    async fn translate_with_timeout(&self, request: &TranslateRequest) -> Result<String, TranslationError> {
        let secs = self.config.item_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.translator.translate_one(request)).await {
            Ok(result) => result,
            Err(_) => Err(TranslationError::Timeout(secs)),
        }
    }

    /// Persist and announce a terminal status
    async fn finish(&self, ctx: &JobContext, done: i64, status: JobStatus) {
        self.persist_progress(ctx.job_id, done, ctx.total, status).await;
        self.emit(JobEvent::Progress {
            job_id: ctx.job_id,
            done,
            total: ctx.total,
            status,
            model: ctx.model.clone(),
        });
    }

    /// Default model when empty, canonical id when given a display label
    async fn resolve_model(&self, provider_id: i64, requested: &str) -> String {
        let mut model = requested.trim().to_string();

        let record = match self.providers.get_provider(provider_id).await {
            Ok(record) => record,
            Err(e) => {
                debug!("Could not load provider {}: {}", provider_id, e);
                None
            }
        };
        let Some(record) = record else {
            return model;
        };

        if model.is_empty() {
            model = record.model.clone();
        }
        if !looks_like_label(&model) {
            return model;
        }

        match self.canonical_model_id(&record, &model).await {
            Ok(Some(id)) => {
                debug!("Resolved model label '{}' to '{}'", model, id);
                id
            }
            Ok(None) => model,
            Err(e) => {
                debug!("Model lookup for '{}' failed, keeping it: {}", model, e);
                model
            }
        }
    }

    async fn canonical_model_id(
        &self,
        record: &ProviderRecord,
        label: &str,
    ) -> Result<Option<String>, ProviderError> {
        let provider = self.factory.build(record)?;
        let models = provider.list_models().await?;
        Ok(models
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(label) || m.description.eq_ignore_ascii_case(label))
            .map(|m| m.name))
    }

    /// Whether the unit already has non-empty text for the locale
    async fn has_translation(&self, unit_id: i64, locale: &str) -> bool {
        match self.translations.get_translation(unit_id, locale).await {
            Ok(Some(translation)) => translation.has_text(),
            Ok(None) => false,
            Err(e) => {
                debug!("Translation lookup for unit {} ({}) failed: {}", unit_id, locale, e);
                false
            }
        }
    }

    async fn file_path(&self, file_id: i64, known: &mut HashMap<i64, String>) -> String {
        if let Some(path) = known.get(&file_id) {
            return path.clone();
        }
        let path = match self.units.get_file(file_id).await {
            Ok(Some(file)) => file.path,
            _ => String::new(),
        };
        known.insert(file_id, path.clone());
        path
    }

    /// Append a job log line and mirror it as an event
    async fn job_log(&self, job_id: i64, level: JobLogLevel, message: String) {
        let record = JobLogRecord::new(job_id, level, message);
        if let Err(e) = self.jobs.add_log(&record).await {
            warn!("Could not write log for job {}: {}", job_id, e);
        }
        self.emit(JobEvent::Log {
            job_id,
            level,
            message: record.message,
            ts: record.ts,
        });
    }

    async fn persist_progress(&self, job_id: i64, done: i64, total: i64, status: JobStatus) {
        if let Err(e) = self.jobs.update_progress(job_id, done, total, status).await {
            warn!("Could not update progress of job {}: {}", job_id, e);
        }
    }

    async fn persist_item(&self, item_id: i64, status: JobItemStatus, error: &str) {
        if let Err(e) = self.jobs.update_item(item_id, status, error).await {
            warn!("Could not update job item {}: {}", item_id, e);
        }
    }

    fn emit(&self, event: JobEvent) {
        self.events.emit(&event);
    }
}

/// Display labels carry spaces or parentheses; model ids do not
fn looks_like_label(model: &str) -> bool {
    model.contains(' ') || model.contains('(') || model.contains(')')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::FileRecord;
    use crate::jobs::events::CollectingSink;
    use crate::providers::mock::{MockProvider, MockProviderFactory};
    use crate::providers::ModelInfo;

    struct Fixture {
        repo: Arc<Repository>,
        factory: MockProviderFactory,
        provider_id: i64,
        file_id: i64,
        unit_ids: Vec<i64>,
    }

    fn test_config() -> JobConfig {
        JobConfig {
            item_timeout_secs: 5,
            max_attempts: 3,
            retry_backoff_ms: 1,
            ..JobConfig::default()
        }
    }

    async fn fixture(provider: MockProvider, provider_kind: &str, unit_count: usize) -> Fixture {
        let repo = Arc::new(Repository::new_in_memory().unwrap());
        let provider_id = repo
            .create_provider(&ProviderRecord::new(provider_kind, "Test", "llama3"))
            .await
            .unwrap();
        let file_id = repo
            .create_file(&FileRecord::new(1, "en.json".into(), "json".into(), "en".into()))
            .await
            .unwrap();
        let units = (0..unit_count)
            .map(|i| UnitRecord::new(file_id, format!("key.{}", i), format!("Hello {} {{name}}", i)))
            .collect();
        let unit_ids = repo.upsert_units(units).await.unwrap();

        Fixture {
            repo,
            factory: MockProviderFactory::new(provider),
            provider_id,
            file_id,
            unit_ids,
        }
    }

    fn runner(fx: &Fixture, sink: Arc<dyn EventSink>) -> JobRunner {
        JobRunner::from_repository(fx.repo.clone(), Arc::new(fx.factory.clone()), test_config())
            .with_event_sink(sink)
    }

    fn progress_values(sink: &CollectingSink, job_id: i64) -> Vec<(i64, JobStatus)> {
        sink.named(job_id, "job.progress")
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Progress { done, status, .. } => Some((done, status)),
                _ => None,
            })
            .collect()
    }

    /// Cancels a job as soon as it reports a given progress value
    struct CancelAt {
        done: i64,
        registry: CancellationRegistry,
        inner: CollectingSink,
    }

    impl EventSink for CancelAt {
        fn emit(&self, event: &JobEvent) {
            self.inner.emit(event);
            if let JobEvent::Progress { job_id, done, .. } = event {
                if *done == self.done {
                    self.registry.cancel(*job_id);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_translateFile_shouldReportMonotonicProgress() {
        let fx = fixture(MockProvider::working(), "ollama", 5).await;
        let sink = Arc::new(CollectingSink::new());
        let runner = runner(&fx, sink.clone());

        let params = TranslateFileParams {
            file_id: fx.file_id,
            target_locales: vec!["fr".into()],
            model: String::new(),
        };
        let job_id = runner.start_translate_file(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let progress = progress_values(&sink, job_id);
        let dones: Vec<i64> = progress.iter().map(|(d, _)| *d).collect();
        assert_eq!(dones, vec![1, 2, 3, 4, 5, 5]);
        assert_eq!(progress.last().unwrap().1, JobStatus::Done);

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!((job.progress, job.total), (5, 5));

        let translation = fx.repo.get_translation(fx.unit_ids[0], "fr").await.unwrap().unwrap();
        assert_eq!(translation.text, "[TRANSLATED to fr] Hello 0 {name}");
        assert_eq!(translation.provider_id, Some(fx.provider_id));

        match &sink.named(job_id, "job.started")[0] {
            JobEvent::Started { total, model, .. } => {
                assert_eq!(*total, 5);
                assert_eq!(model, "llama3");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!runner.is_active(job_id));
    }

    #[tokio::test]
    async fn test_cancel_afterSecondItem_shouldStopJob() {
        let fx = fixture(MockProvider::working(), "ollama", 5).await;
        let base = JobRunner::from_repository(fx.repo.clone(), Arc::new(fx.factory.clone()), test_config());
        let sink = Arc::new(CancelAt {
            done: 2,
            registry: base.canceller(),
            inner: CollectingSink::new(),
        });
        let runner = base.with_event_sink(sink.clone());

        let params = TranslateUnitsParams {
            unit_ids: fx.unit_ids.clone(),
            locales: vec!["fr".into()],
            model: String::new(),
            force: false,
        };
        let job_id = runner.start_translate_units(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Canceled);
        assert_eq!(job.progress, 2);
        assert_eq!(sink.inner.named(job_id, "job.item.start").len(), 2);
        assert_eq!(fx.factory.provider().request_count(), 2);

        let last = progress_values(&sink.inner, job_id).pop().unwrap();
        assert_eq!(last, (2, JobStatus::Canceled));
        assert_eq!(runner.list_items(job_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_translateUnit_withExistingLocales_shouldOnlyScheduleMissing() {
        let fx = fixture(MockProvider::working(), "ollama", 1).await;
        let unit_id = fx.unit_ids[0];
        for locale in ["fr", "de"] {
            fx.repo
                .upsert_translation(&TranslationRecord::machine(unit_id, locale, "done", None))
                .await
                .unwrap();
        }
        let sink = Arc::new(CollectingSink::new());
        let runner = runner(&fx, sink.clone());

        let params = TranslateUnitParams {
            unit_id,
            locales: vec!["fr".into(), "de".into(), "es".into()],
            model: String::new(),
            force: false,
        };
        let job_id = runner.start_translate_unit(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!((job.progress, job.total), (1, 1));
        let starts = sink.named(job_id, "job.item.start");
        assert_eq!(starts.len(), 1);
        assert!(matches!(&starts[0], JobEvent::ItemStart { locale, .. } if locale == "es"));
        assert_eq!(fx.repo.get_translation(unit_id, "fr").await.unwrap().unwrap().text, "done");
    }

    #[tokio::test]
    async fn test_translateUnit_withForce_shouldRetranslateAndBypassCache() {
        let fx = fixture(MockProvider::working(), "ollama", 1).await;
        let unit_id = fx.unit_ids[0];
        let runner = runner(&fx, Arc::new(NoopSink));
        let params = TranslateUnitParams {
            unit_id,
            locales: vec!["fr".into()],
            model: String::new(),
            force: true,
        };

        let first = runner.start_translate_unit(1, fx.provider_id, params.clone()).await.unwrap();
        runner.wait(first).await;
        let second = runner.start_translate_unit(1, fx.provider_id, params).await.unwrap();
        runner.wait(second).await;

        let job = runner.get_job(second).await.unwrap().unwrap();
        assert_eq!((job.progress, job.total), (1, 1));
        assert_eq!(fx.factory.provider().request_count(), 2);
    }

    #[tokio::test]
    async fn test_translateUnit_withMissingUnit_shouldFailJob() {
        let fx = fixture(MockProvider::working(), "ollama", 1).await;
        let runner = runner(&fx, Arc::new(NoopSink));

        let params = TranslateUnitParams {
            unit_id: 999,
            locales: vec!["fr".into()],
            model: String::new(),
            force: false,
        };
        let job_id = runner.start_translate_unit(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!((job.progress, job.total), (0, 0));
        assert!(runner.list_items(job_id).await.unwrap().is_empty());
        let logs = runner.list_logs(job_id, 50).await.unwrap();
        assert!(logs.iter().any(|l| l.level == JobLogLevel::Error));
    }

    #[tokio::test]
    async fn test_translateUnits_withUnknownUnit_shouldSkipIt() {
        let fx = fixture(MockProvider::working(), "ollama", 2).await;
        let sink = Arc::new(CollectingSink::new());
        let runner = runner(&fx, sink.clone());

        let params = TranslateUnitsParams {
            unit_ids: vec![fx.unit_ids[0], 999, fx.unit_ids[1]],
            locales: vec!["fr".into()],
            model: String::new(),
            force: false,
        };
        let job_id = runner.start_translate_units(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!((job.progress, job.total), (2, 3));
        assert_eq!(sink.named(job_id, "job.item.start").len(), 2);
    }

    #[tokio::test]
    async fn test_itemFailure_shouldBeRecordedWithoutStoppingJob() {
        let provider = MockProvider::working().with_script(vec![Ok("Bonjour".into())]);
        let fx = fixture(provider, "ollama", 2).await;
        let sink = Arc::new(CollectingSink::new());
        let runner = runner(&fx, sink.clone());

        let params = TranslateFileParams {
            file_id: fx.file_id,
            target_locales: vec!["fr".into()],
            model: String::new(),
        };
        let job_id = runner.start_translate_file(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let items = runner.list_items(job_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].status, JobItemStatus::Failed);
        assert!(items[0].error.contains("{name}"));
        assert_eq!(items[1].status, JobItemStatus::Done);

        let logs = runner.list_logs(job_id, 50).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == JobLogLevel::Error && l.message.starts_with("key.0 -> fr:")));
        assert!(fx.repo.get_translation(fx.unit_ids[0], "fr").await.unwrap().is_none());

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress, 2);
    }

    #[tokio::test]
    async fn test_slowProvider_shouldTimeOutItem() {
        let fx = fixture(MockProvider::slow(3_000), "ollama", 1).await;
        let config = JobConfig {
            item_timeout_secs: 1,
            ..test_config()
        };
        let runner = JobRunner::from_repository(fx.repo.clone(), Arc::new(fx.factory.clone()), config);

        let params = TranslateUnitParams {
            unit_id: fx.unit_ids[0],
            locales: vec!["fr".into()],
            model: String::new(),
            force: false,
        };
        let job_id = runner.start_translate_unit(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let items = runner.list_items(job_id).await.unwrap();
        assert_eq!(items[0].status, JobItemStatus::Failed);
        assert_eq!(items[0].error, "translation timed out after 1s");
    }

    #[tokio::test]
    async fn test_startJob_withModelLabel_shouldResolveCanonicalId() {
        let provider = MockProvider::working().with_models(vec![ModelInfo {
            name: "meta-llama/llama-3-8b-instruct".into(),
            description: "Meta: Llama 3 8B Instruct".into(),
            context_tokens: 8192,
        }]);
        let fx = fixture(provider, "openrouter", 1).await;
        let sink = Arc::new(CollectingSink::new());
        let runner = runner(&fx, sink.clone());

        let params = TranslateUnitParams {
            unit_id: fx.unit_ids[0],
            locales: vec!["fr".into()],
            model: "meta: llama 3 8b instruct".into(),
            force: false,
        };
        let job_id = runner.start_translate_unit(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        let stored: TranslateUnitParams = serde_json::from_str(&job.params_json).unwrap();
        assert_eq!(stored.model, "meta-llama/llama-3-8b-instruct");
        assert_eq!(fx.factory.provider().requests()[0].model, "meta-llama/llama-3-8b-instruct");
    }

    #[tokio::test]
    async fn test_startJob_withUnmatchedLabel_shouldKeepIt() {
        let fx = fixture(MockProvider::failing(), "ollama", 1).await;
        let runner = runner(&fx, Arc::new(NoopSink));

        let model = runner.resolve_model(fx.provider_id, "Some Label (beta)").await;
        assert_eq!(model, "Some Label (beta)");
        assert_eq!(runner.resolve_model(fx.provider_id, "  ").await, "llama3");
    }

    #[tokio::test]
    async fn test_deleteJob_shouldRemoveRecord() {
        let fx = fixture(MockProvider::working(), "ollama", 1).await;
        let runner = runner(&fx, Arc::new(NoopSink));
        let params = TranslateFileParams {
            file_id: fx.file_id,
            target_locales: vec!["fr".into()],
            model: String::new(),
        };
        let job_id = runner.start_translate_file(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        assert!(runner.delete_job(job_id).await.unwrap());
        assert!(runner.get_job(job_id).await.unwrap().is_none());
        assert!(!runner.cancel(job_id));
    }

    #[tokio::test]
    async fn test_deleteJob_afterCancel_shouldWaitForInFlightItem() {
        let fx = fixture(MockProvider::slow(300), "ollama", 1).await;
        let runner = runner(&fx, Arc::new(NoopSink));
        let unit_id = fx.unit_ids[0];
        let params = TranslateUnitParams {
            unit_id,
            locales: vec!["fr".into()],
            model: String::new(),
            force: false,
        };
        let job_id = runner.start_translate_unit(1, fx.provider_id, params).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(runner.cancel(job_id));
        assert!(runner.delete_job(job_id).await.unwrap());

        let written = fx.repo.get_translation(unit_id, "fr").await.unwrap();
        assert!(written.is_some());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(runner.get_job(job_id).await.unwrap().is_none());
        assert!(runner.list_items(job_id).await.unwrap().is_empty());
        assert!(runner.list_logs(job_id, 50).await.unwrap().is_empty());
    }

    struct BrokenUnits;

    #[async_trait::async_trait]
    impl UnitStore for BrokenUnits {
        async fn list_units_by_file(&self, _: i64) -> anyhow::Result<Vec<UnitRecord>> {
            Err(anyhow::anyhow!("units table is locked"))
        }

        async fn get_unit(&self, _: i64) -> anyhow::Result<Option<UnitRecord>> {
            Err(anyhow::anyhow!("units table is locked"))
        }

        async fn create_file(&self, _: &FileRecord) -> anyhow::Result<i64> {
            Err(anyhow::anyhow!("units table is locked"))
        }

        async fn get_file(&self, _: i64) -> anyhow::Result<Option<FileRecord>> {
            Err(anyhow::anyhow!("units table is locked"))
        }

        async fn upsert_units(&self, _: Vec<UnitRecord>) -> anyhow::Result<Vec<i64>> {
            Err(anyhow::anyhow!("units table is locked"))
        }
    }

    #[tokio::test]
    async fn test_translateFile_withBrokenUnitStore_shouldFailJob() {
        let fx = fixture(MockProvider::working(), "ollama", 2).await;
        let sink = Arc::new(CollectingSink::new());
        let runner = runner(&fx, sink.clone()).with_unit_store(Arc::new(BrokenUnits));

        let params = TranslateFileParams {
            file_id: fx.file_id,
            target_locales: vec!["fr".into()],
            model: String::new(),
        };
        let job_id = runner.start_translate_file(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!((job.progress, job.total), (0, 0));
        assert!(runner.list_items(job_id).await.unwrap().is_empty());
        assert_eq!(fx.factory.provider().request_count(), 0);

        let logs = runner.list_logs(job_id, 50).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == JobLogLevel::Error && l.message.contains("units table is locked")));
        assert_eq!(progress_values(&sink, job_id), vec![(0, JobStatus::Failed)]);
    }

    struct BrokenTranslations;

    #[async_trait::async_trait]
    impl TranslationStore for BrokenTranslations {
        async fn upsert_translation(&self, _: &TranslationRecord) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("translations table is locked"))
        }

        async fn get_translation(&self, _: i64, _: &str) -> anyhow::Result<Option<TranslationRecord>> {
            Err(anyhow::anyhow!("translations table is locked"))
        }

        async fn list_translations_by_file_locale(
            &self,
            _: i64,
            _: &str,
        ) -> anyhow::Result<Vec<TranslationRecord>> {
            Err(anyhow::anyhow!("translations table is locked"))
        }
    }

    #[tokio::test]
    async fn test_translateFile_withBrokenTranslationStore_shouldCountEveryPair() {
        let fx = fixture(MockProvider::working(), "ollama", 2).await;
        let runner = runner(&fx, Arc::new(NoopSink)).with_translation_store(Arc::new(BrokenTranslations));

        let params = TranslateFileParams {
            file_id: fx.file_id,
            target_locales: vec!["fr".into(), "de".into()],
            model: String::new(),
        };
        let job_id = runner.start_translate_file(1, fx.provider_id, params).await.unwrap();
        runner.wait(job_id).await;

        let job = runner.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!((job.progress, job.total), (4, 4));
        assert!(fx.repo.get_translation(fx.unit_ids[0], "fr").await.unwrap().is_none());
    }
}
