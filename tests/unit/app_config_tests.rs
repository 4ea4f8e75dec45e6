/*!
 * Tests for configuration loading and validation
 */

use locail::app_config::{Config, LogLevel};

use crate::common::create_temp_dir;

#[test]
fn test_save_thenLoad_shouldPreserveValues() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("custom.json");
    let mut config = Config::default();
    config.source_language = "en-GB".into();
    config.log_level = LogLevel::Debug;
    config.database_path = Some(dir.path().join("db.sqlite").display().to_string());
    config.jobs.item_timeout_secs = 15;

    config.save(&path).unwrap();
    let loaded = Config::load_or_create(&path).unwrap();

    assert_eq!(loaded.source_language, "en-GB");
    assert_eq!(loaded.log_level, LogLevel::Debug);
    assert_eq!(loaded.jobs.item_timeout_secs, 15);
    assert_eq!(loaded.database_file().unwrap(), dir.path().join("db.sqlite"));
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_validate_withBlankDatabasePath_shouldFail() {
    let config = Config {
        database_path: Some("  ".into()),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}
