/*!
 * Common test utilities for the locail test suite
 */

use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

use locail::database::models::{FileRecord, ProviderRecord, UnitRecord};
use locail::database::{ProviderStore, Repository, UnitStore};

/// Routes `log` output through the test harness
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Seeded in-memory database
pub struct TestProject {
    pub repo: Arc<Repository>,
    pub provider_id: i64,
    pub file_id: i64,
    pub unit_ids: Vec<i64>,
}

/// Creates an in-memory repository with one provider, one file and the given units
pub async fn seed_project(provider_kind: &str, units: &[(&str, &str)]) -> Result<TestProject> {
    let repo = Arc::new(Repository::new_in_memory()?);
    let provider_id = repo
        .create_provider(&ProviderRecord::new(provider_kind, "Test provider", "test-model"))
        .await?;
    let file_id = repo
        .create_file(&FileRecord::new(7, "locales/en.json".into(), "json".into(), "en".into()))
        .await?;
    let records = units
        .iter()
        .map(|(key, text)| UnitRecord::new(file_id, *key, *text))
        .collect();
    let unit_ids = repo.upsert_units(records).await?;

    Ok(TestProject {
        repo,
        provider_id,
        file_id,
        unit_ids,
    })
}
