//! Start parameters for each job kind, persisted as `params_json`.

use serde::{Deserialize, Serialize};

/// Translate every unit of a file into a set of locales
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslateFileParams {
    pub file_id: i64,
    pub target_locales: Vec<String>,
    /// Empty means the provider default
    #[serde(default)]
    pub model: String,
}

/// Translate one unit into a set of locales
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslateUnitParams {
    pub unit_id: i64,
    pub locales: Vec<String>,
    #[serde(default)]
    pub model: String,
    /// Re-translate locales that already have text, bypassing the cache
    #[serde(default)]
    pub force: bool,
}

/// Translate an explicit list of units into a set of locales
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslateUnitsParams {
    pub unit_ids: Vec<i64>,
    pub locales: Vec<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub force: bool,
}
