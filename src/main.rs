// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use locail::app_config::{Config, LogLevel};
use locail::database::models::{FileRecord, JobStatus, ProviderRecord, UnitRecord};
use locail::database::{DatabaseConnection, ProviderStore, Repository, UnitStore};
use locail::jobs::{
    ChannelSink, JobEvent, JobRunner, TranslateFileParams, TranslateUnitParams,
    TranslateUnitsParams,
};
use locail::language_utils::validate_locale;
use locail::providers::{build_provider, DefaultProviderFactory, ProviderKind};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProviderKind {
    Ollama,
    #[value(name = "openrouter")]
    OpenRouter,
}

impl From<CliProviderKind> for ProviderKind {
    fn from(cli_kind: CliProviderKind) -> Self {
        match cli_kind {
            CliProviderKind::Ollama => ProviderKind::Ollama,
            CliProviderKind::OpenRouter => ProviderKind::OpenRouter,
        }
    }
}

/// locail - localization files translated with AI
#[derive(Parser, Debug)]
#[command(name = "locail")]
#[command(version)]
#[command(about = "AI-powered localization file translation")]
#[command(long_about = "locail translates imported localization units with LLM providers.
Every translation request runs as a background job with per-item logs.

EXAMPLES:
    locail providers add --kind ollama --name local --model llama3
    locail files add --path locales/en.json --locale en
    locail units add --file 1 --key greeting --text 'Hello {name}'
    locail translate file --provider 1 --file 1 --locale fr,de
    locail jobs logs 3
    locail completions bash > locail.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage LLM providers
    #[command(subcommand)]
    Providers(ProviderCommands),

    /// Register localization files
    #[command(subcommand)]
    Files(FileCommands),

    /// Add translatable units to a file
    #[command(subcommand)]
    Units(UnitCommands),

    /// Start a translation job and follow its progress
    #[command(subcommand)]
    Translate(TranslateCommands),

    /// Inspect and delete jobs
    #[command(subcommand)]
    Jobs(JobCommands),

    /// Generate shell completions for locail
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ProviderCommands {
    /// Register a provider
    Add {
        #[arg(long, value_enum)]
        kind: CliProviderKind,
        #[arg(long)]
        name: String,
        /// Default model
        #[arg(long)]
        model: String,
        /// Override the provider's default endpoint
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long, env = "LOCAIL_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// List registered providers
    List,
    /// Check that a provider is reachable
    Test { id: i64 },
    /// List the models a provider offers
    Models {
        id: i64,
        /// Show the last saved listing instead of querying the provider
        #[arg(long)]
        cached: bool,
    },
    /// Remove a provider
    Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
enum FileCommands {
    /// Register a file
    Add {
        #[arg(long, default_value_t = 1)]
        project: i64,
        #[arg(long)]
        path: String,
        #[arg(long, default_value = "json")]
        format: String,
        /// Source locale of the file
        #[arg(long)]
        locale: String,
    },
}

#[derive(Subcommand, Debug)]
enum UnitCommands {
    /// Add or update a unit by key
    Add {
        #[arg(long)]
        file: i64,
        #[arg(long)]
        key: String,
        #[arg(long)]
        text: String,
        /// Note for translators
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TranslateCommands {
    /// Translate every unit of a file
    File {
        #[arg(long)]
        provider: i64,
        #[arg(long)]
        file: i64,
        #[arg(long = "locale", required = true, value_delimiter = ',')]
        locales: Vec<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Translate one unit
    Unit {
        #[arg(long)]
        provider: i64,
        #[arg(long)]
        unit: i64,
        #[arg(long = "locale", required = true, value_delimiter = ',')]
        locales: Vec<String>,
        #[arg(long)]
        model: Option<String>,
        /// Re-translate existing locales and skip the cache
        #[arg(short, long)]
        force: bool,
    },
    /// Translate a list of units
    Units {
        #[arg(long)]
        provider: i64,
        #[arg(long = "unit", required = true, value_delimiter = ',')]
        units: Vec<i64>,
        #[arg(long = "locale", required = true, value_delimiter = ',')]
        locales: Vec<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum JobCommands {
    /// Most recent jobs first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Job status and items
    Show { id: i64 },
    /// Job log lines
    Logs {
        id: i64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a job, canceling it first if it is running
    Delete { id: i64 },
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and prefix for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, prefix) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, prefix, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is applied with set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "locail", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let config = Config::load_or_create(&cli.config)?;
    config.validate().context("Configuration validation failed")?;

    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let db_path = config.database_file()?;
    let repo = Arc::new(Repository::new(DatabaseConnection::new(&db_path)?));

    match cli.command {
        Commands::Providers(command) => run_providers(&repo, command).await,
        Commands::Files(command) => run_files(&repo, command).await,
        Commands::Units(command) => run_units(&repo, command).await,
        Commands::Translate(command) => run_translate(&repo, &config, command).await,
        Commands::Jobs(command) => run_jobs(&repo, &config, command).await,
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_providers(repo: &Arc<Repository>, command: ProviderCommands) -> Result<()> {
    match command {
        ProviderCommands::Add { kind, name, model, base_url, api_key } => {
            let kind: ProviderKind = kind.into();
            let mut record = ProviderRecord::new(kind.as_str(), name, model);
            if let Some(base_url) = base_url {
                url::Url::parse(&base_url).context(format!("Invalid base URL: {}", base_url))?;
                record.base_url = base_url;
            }
            record.api_key = api_key.unwrap_or_default();
            if kind == ProviderKind::OpenRouter && record.api_key.is_empty() {
                return Err(anyhow!("An API key is required for OpenRouter providers"));
            }

            let id = repo.create_provider(&record).await?;
            info!("Registered {} provider '{}' with id {}", kind, record.name, id);
            println!("{}", id);
        }
        ProviderCommands::List => {
            for provider in repo.list_providers().await? {
                let base_url = if provider.base_url.is_empty() {
                    "(default)"
                } else {
                    provider.base_url.as_str()
                };
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    provider.id, provider.kind, provider.name, provider.model, base_url
                );
            }
        }
        ProviderCommands::Test { id } => {
            let record = load_provider(repo, id).await?;
            build_provider(&record)?.test_connection().await?;
            println!("Provider {} ({}) is reachable", record.id, record.name);
        }
        ProviderCommands::Models { id, cached } => {
            let record = load_provider(repo, id).await?;
            if cached {
                for model in repo.list_model_cache(id).await? {
                    println!("{}", model.name);
                }
                return Ok(());
            }

            let models = build_provider(&record)?.list_models().await?;
            let names = models.iter().map(|m| m.name.clone()).collect();
            repo.save_model_cache(id, names).await?;
            for model in models {
                if model.context_tokens > 0 {
                    println!("{}\t{}\t{}", model.name, model.description, model.context_tokens);
                } else {
                    println!("{}\t{}", model.name, model.description);
                }
            }
        }
        ProviderCommands::Remove { id } => {
            if !repo.delete_provider(id).await? {
                return Err(anyhow!("Provider {} not found", id));
            }
            info!("Removed provider {}", id);
        }
    }
    Ok(())
}

async fn load_provider(repo: &Arc<Repository>, id: i64) -> Result<ProviderRecord> {
    repo.get_provider(id)
        .await?
        .ok_or_else(|| anyhow!("Provider {} not found", id))
}

async fn run_files(repo: &Arc<Repository>, command: FileCommands) -> Result<()> {
    match command {
        FileCommands::Add { project, path, format, locale } => {
            validate_locale(&locale)?;
            let id = repo
                .create_file(&FileRecord::new(project, path, format, locale))
                .await?;
            println!("{}", id);
        }
    }
    Ok(())
}

async fn run_units(repo: &Arc<Repository>, command: UnitCommands) -> Result<()> {
    match command {
        UnitCommands::Add { file, key, text, context } => {
            if repo.get_file(file).await?.is_none() {
                return Err(anyhow!("File {} not found", file));
            }
            let mut unit = UnitRecord::new(file, key, text);
            if let Some(context) = context {
                unit = unit.with_context(context);
            }
            let ids = repo.upsert_units(vec![unit]).await?;
            println!("{}", ids[0]);
        }
    }
    Ok(())
}

async fn run_translate(
    repo: &Arc<Repository>,
    config: &Config,
    command: TranslateCommands,
) -> Result<()> {
    let (sink, events) = ChannelSink::new();
    let runner = JobRunner::from_repository(
        repo.clone(),
        Arc::new(DefaultProviderFactory),
        config.jobs.clone(),
    )
    .with_source_language(config.source_language.clone())
    .with_event_sink(Arc::new(sink));

    let job_id = match command {
        TranslateCommands::File { provider, file, locales, model } => {
            validate_locales(&locales)?;
            let project = repo
                .get_file(file)
                .await?
                .ok_or_else(|| anyhow!("File {} not found", file))?
                .project_id;
            let params = TranslateFileParams {
                file_id: file,
                target_locales: locales,
                model: model.unwrap_or_default(),
            };
            runner.start_translate_file(project, provider, params).await?
        }
        TranslateCommands::Unit { provider, unit, locales, model, force } => {
            validate_locales(&locales)?;
            let project = project_of_units(repo, &[unit]).await?;
            let params = TranslateUnitParams {
                unit_id: unit,
                locales,
                model: model.unwrap_or_default(),
                force,
            };
            runner.start_translate_unit(project, provider, params).await?
        }
        TranslateCommands::Units { provider, units, locales, model, force } => {
            validate_locales(&locales)?;
            let project = project_of_units(repo, &units).await?;
            let params = TranslateUnitsParams {
                unit_ids: units,
                locales,
                model: model.unwrap_or_default(),
                force,
            };
            runner.start_translate_units(project, provider, params).await?
        }
    };

    follow_job(&runner, job_id, events).await
}

fn validate_locales(locales: &[String]) -> Result<()> {
    for locale in locales {
        validate_locale(locale)?;
    }
    Ok(())
}

/// Project of the first unit that loads; the job skips the others
async fn project_of_units(repo: &Arc<Repository>, unit_ids: &[i64]) -> Result<i64> {
    for unit_id in unit_ids {
        let unit = match repo.get_unit(*unit_id).await {
            Ok(Some(unit)) => unit,
            Ok(None) => {
                warn!("Unit {} not found, skipping", unit_id);
                continue;
            }
            Err(e) => {
                warn!("Could not load unit {}: {}", unit_id, e);
                continue;
            }
        };
        if let Some(file) = repo.get_file(unit.file_id).await? {
            return Ok(file.project_id);
        }
    }
    Err(anyhow!("None of the units {:?} could be loaded", unit_ids))
}

/// Drive a progress bar from job events until the job reaches a terminal state
async fn follow_job(
    runner: &JobRunner,
    job_id: i64,
    mut events: UnboundedReceiver<JobEvent>,
) -> Result<()> {
    let progress_bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));

    let mut failures = 0;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if event.job_id() != job_id {
                    continue;
                }
                match event {
                    JobEvent::Started { total, model, .. } => {
                        progress_bar.set_length(total.max(0) as u64);
                        info!("Job {} started with model {}", job_id, model);
                    }
                    JobEvent::ItemStart { key, locale, .. } => {
                        progress_bar.set_message(format!("{} -> {}", key, locale));
                    }
                    JobEvent::ItemDone { key, locale, error: Some(error), .. } => {
                        failures += 1;
                        progress_bar.println(format!("{} -> {} failed: {}", key, locale, error));
                    }
                    JobEvent::Progress { done, total, status, .. } => {
                        progress_bar.set_length(total.max(0) as u64);
                        progress_bar.set_position(done.max(0) as u64);
                        if status.is_terminal() {
                            break;
                        }
                    }
                    JobEvent::Log { message, .. } => debug!("job {}: {}", job_id, message),
                    JobEvent::ItemDone { .. } => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, canceling job {}", job_id);
                runner.cancel(job_id);
            }
        }
    }

    runner.wait(job_id).await;
    progress_bar.finish_and_clear();

    let job = runner
        .get_job(job_id)
        .await?
        .ok_or_else(|| anyhow!("Job {} not found", job_id))?;
    println!(
        "Job {} {}: {}/{} item(s), {} failed",
        job.id, job.status, job.progress, job.total, failures
    );

    match job.status {
        JobStatus::Failed => Err(anyhow!("Job {} failed, see `locail jobs logs {}`", job.id, job.id)),
        _ => Ok(()),
    }
}

async fn run_jobs(repo: &Arc<Repository>, config: &Config, command: JobCommands) -> Result<()> {
    let runner = JobRunner::from_repository(
        repo.clone(),
        Arc::new(DefaultProviderFactory),
        config.jobs.clone(),
    );

    match command {
        JobCommands::List { limit } => {
            for job in runner.list_jobs(limit.unwrap_or(config.jobs.list_limit)).await? {
                println!(
                    "{}\t{}\t{}\t{}/{}\t{}",
                    job.id, job.kind, job.status, job.progress, job.total, job.created_at
                );
            }
        }
        JobCommands::Show { id } => {
            let job = runner
                .get_job(id)
                .await?
                .ok_or_else(|| anyhow!("Job {} not found", id))?;
            println!("Job {} ({})", job.id, job.kind);
            println!("  status:   {}", job.status);
            println!(
                "  progress: {}/{} ({:.0}%)",
                job.progress,
                job.total,
                job.completion_percentage()
            );
            println!("  params:   {}", job.params_json);
            for item in runner.list_items(id).await? {
                let unit = item.unit_id.map(|u| u.to_string()).unwrap_or_default();
                let locale = item.locale.unwrap_or_default();
                if item.error.is_empty() {
                    println!("  - unit {} {} {}", unit, locale, item.status);
                } else {
                    println!("  - unit {} {} {}: {}", unit, locale, item.status, item.error);
                }
            }
        }
        JobCommands::Logs { id, limit } => {
            for line in runner.list_logs(id, limit.unwrap_or(config.jobs.log_limit)).await? {
                println!("{} [{}] {}", line.ts, line.level, line.message);
            }
        }
        JobCommands::Delete { id } => {
            if !runner.delete_job(id).await? {
                return Err(anyhow!("Job {} not found", id));
            }
            info!("Deleted job {}", id);
        }
    }
    Ok(())
}
