/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Every unit of a file for a set of locales
    TranslateFile,
    /// One unit for a set of locales
    TranslateUnit,
    /// An explicit list of units for a set of locales
    TranslateUnits,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::TranslateFile => write!(f, "translate_file"),
            JobKind::TranslateUnit => write!(f, "translate_unit"),
            JobKind::TranslateUnits => write!(f, "translate_units"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "translate_file" => Ok(JobKind::TranslateFile),
            "translate_unit" => Ok(JobKind::TranslateUnit),
            "translate_units" => Ok(JobKind::TranslateUnits),
            _ => Err(anyhow::anyhow!("Invalid job kind: {}", s)),
        }
    }
}

/// Job lifecycle status: queued -> running -> {done, failed, canceled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Record created, total not yet computed
    Queued,
    /// Background task is processing items
    Running,
    /// All items attempted
    Done,
    /// Setup failed before any item started
    Failed,
    /// Cancellation was observed
    Canceled,
}

impl JobStatus {
    /// Whether the job can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Canceled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            "canceled" => Ok(JobStatus::Canceled),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Status of one (unit, locale) attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobItemStatus {
    Running,
    Done,
    Failed,
}

impl fmt::Display for JobItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobItemStatus::Running => write!(f, "running"),
            JobItemStatus::Done => write!(f, "done"),
            JobItemStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(JobItemStatus::Running),
            "done" => Ok(JobItemStatus::Done),
            "failed" => Ok(JobItemStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job item status: {}", s)),
        }
    }
}

/// Severity of a job log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobLogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for JobLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobLogLevel::Info => write!(f, "info"),
            JobLogLevel::Warn => write!(f, "warn"),
            JobLogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for JobLogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(JobLogLevel::Info),
            "warn" | "warning" => Ok(JobLogLevel::Warn),
            "error" => Ok(JobLogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Translation status for a (unit, locale) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// Produced by a provider
    Machine,
    /// Accepted by a human
    Reviewed,
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationStatus::Machine => write!(f, "machine"),
            TranslationStatus::Reviewed => write!(f, "reviewed"),
        }
    }
}

impl std::str::FromStr for TranslationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "machine" => Ok(TranslationStatus::Machine),
            "reviewed" => Ok(TranslationStatus::Reviewed),
            _ => Err(anyhow::anyhow!("Invalid translation status: {}", s)),
        }
    }
}

/// Job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Database ID (assigned on insert)
    pub id: i64,
    pub kind: JobKind,
    pub status: JobStatus,
    pub project_id: Option<i64>,
    pub provider_id: Option<i64>,
    /// Serialized start parameters
    pub params_json: String,
    /// Number of finished items
    pub progress: i64,
    pub total: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl JobRecord {
    /// Create a new queued job record (without database ID)
    pub fn new(
        kind: JobKind,
        project_id: Option<i64>,
        provider_id: Option<i64>,
        params_json: String,
        total: i64,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0,
            kind,
            status: JobStatus::Queued,
            project_id,
            provider_id,
            params_json,
            progress: 0,
            total,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Calculate completion percentage
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.progress as f64 / self.total as f64) * 100.0
    }
}

/// One (unit, locale) attempt within a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobItemRecord {
    pub id: i64,
    pub job_id: i64,
    pub unit_id: Option<i64>,
    pub locale: Option<String>,
    pub status: JobItemStatus,
    /// Empty unless the item failed
    pub error: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobItemRecord {
    /// Create a running item for a unit and locale
    pub fn running(job_id: i64, unit_id: i64, locale: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0,
            job_id,
            unit_id: Some(unit_id),
            locale: Some(locale.to_string()),
            status: JobItemStatus::Running,
            error: String::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Append-only job log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogRecord {
    pub id: i64,
    pub job_id: i64,
    /// Timestamp (RFC 3339)
    pub ts: String,
    pub level: JobLogLevel,
    pub message: String,
}

impl JobLogRecord {
    pub fn new(job_id: i64, level: JobLogLevel, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            job_id,
            ts: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.into(),
        }
    }
}

/// Imported localization file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub project_id: i64,
    pub path: String,
    pub format: String,
    /// Source locale of the file
    pub locale: String,
    pub hash: String,
    pub created_at: String,
}

impl FileRecord {
    pub fn new(project_id: i64, path: String, format: String, locale: String) -> Self {
        Self {
            id: 0,
            project_id,
            path,
            format,
            locale,
            hash: String::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A translatable string owned by a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: i64,
    pub file_id: i64,
    pub key: String,
    pub source_text: String,
    /// Free-form hint for translators
    pub context: String,
    pub metadata_json: String,
    pub created_at: String,
}

impl UnitRecord {
    pub fn new(file_id: i64, key: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            id: 0,
            file_id,
            key: key.into(),
            source_text: source_text.into(),
            context: String::new(),
            metadata_json: String::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach a translator context hint
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Current accepted text for a (unit, locale) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: i64,
    pub unit_id: i64,
    pub locale: String,
    pub text: String,
    pub status: TranslationStatus,
    pub provider_id: Option<i64>,
    pub confidence: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl TranslationRecord {
    /// Create a machine translation record
    pub fn machine(unit_id: i64, locale: &str, text: &str, provider_id: Option<i64>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0,
            unit_id,
            locale: locale.to_string(),
            text: text.to_string(),
            status: TranslationStatus::Machine,
            provider_id,
            confidence: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// A translation counts as present only when its text is non-blank
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Content-addressed translation cache record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Masked source text
    pub source_text: String,
    pub source_language: String,
    pub target_language: String,
    /// Provider kind tag (e.g. "ollama")
    pub provider: String,
    pub model: String,
    pub translation: String,
    pub created_at: String,
}

impl CacheRecord {
    pub fn new(
        source_text: String,
        source_language: String,
        target_language: String,
        provider: String,
        model: String,
        translation: String,
    ) -> Self {
        Self {
            source_text,
            source_language,
            target_language,
            provider,
            model,
            translation,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Configured LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: i64,
    /// Stored type tag, parsed into `ProviderKind` by the factory
    pub kind: String,
    pub name: String,
    pub base_url: String,
    /// Default model
    pub model: String,
    pub api_key: String,
    pub options_json: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ProviderRecord {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, model: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0,
            kind: kind.into(),
            name: name.into(),
            base_url: String::new(),
            model: model.into(),
            api_key: String::new(),
            options_json: String::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Cached model name listed by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderModelRecord {
    pub id: i64,
    pub provider_id: i64,
    pub name: String,
    pub updated_at: String,
}

/// Where a prompt template applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScope {
    Global,
    Project,
    Provider,
}

impl fmt::Display for TemplateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateScope::Global => write!(f, "global"),
            TemplateScope::Project => write!(f, "project"),
            TemplateScope::Provider => write!(f, "provider"),
        }
    }
}

impl std::str::FromStr for TemplateScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(TemplateScope::Global),
            "project" => Ok(TemplateScope::Project),
            "provider" => Ok(TemplateScope::Provider),
            _ => Err(anyhow::anyhow!("Invalid template scope: {}", s)),
        }
    }
}

/// Stored prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: i64,
    pub scope: TemplateScope,
    /// Project or provider id for non-global scopes
    pub ref_id: Option<i64>,
    /// e.g. "translate_single"
    pub template_type: String,
    /// "system" or "user"
    pub role: String,
    pub body: String,
    pub is_default: bool,
    pub updated_at: String,
}

impl TemplateRecord {
    pub fn new(
        scope: TemplateScope,
        ref_id: Option<i64>,
        template_type: impl Into<String>,
        role: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            scope,
            ref_id,
            template_type: template_type.into(),
            role: role.into(),
            body: body.into(),
            is_default: false,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
