use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::database::DatabaseConnection;

/// Application configuration module
/// This module handles loading, validating and saving the configuration file.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// SQLite database file; the platform data directory when unset
    #[serde(default)]
    pub database_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Source language of imported units; empty when unspecified
    #[serde(default)]
    pub source_language: String,

    /// Job runner settings
    #[serde(default)]
    pub jobs: JobConfig,
}

/// Job runner settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobConfig {
    /// Upper bound for one item, retries included
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,

    /// Provider attempts per item
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay; attempt `n` waits `n` times this
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Jobs shown by `jobs list`
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,

    /// Log lines shown by `jobs logs`
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            item_timeout_secs: default_item_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            list_limit: default_list_limit(),
            log_limit: default_log_limit(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_item_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_list_limit() -> usize {
    50
}

fn default_log_limit() -> usize {
    200
}

impl Config {
    /// Load the configuration file, writing a default one when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !self.source_language.is_empty() {
            crate::language_utils::validate_locale(&self.source_language)?;
        }
        if self.jobs.max_attempts == 0 {
            return Err(anyhow!("jobs.max_attempts must be at least 1"));
        }
        if self.jobs.item_timeout_secs == 0 {
            return Err(anyhow!("jobs.item_timeout_secs must be at least 1"));
        }
        if matches!(&self.database_path, Some(p) if p.trim().is_empty()) {
            return Err(anyhow!("database_path must not be empty when set"));
        }
        Ok(())
    }

    /// Database file to open
    pub fn database_file(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => DatabaseConnection::default_database_path(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: None,
            log_level: LogLevel::default(),
            source_language: String::new(),
            jobs: JobConfig::default(),
        }
    }
}
