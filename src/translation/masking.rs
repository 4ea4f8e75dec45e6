/*!
 * Placeholder and inline-tag protection.
 *
 * Interpolation placeholders (`{name}`) and inline markup tags (`<b>`,
 * `<clr:255,0,0>`) are swapped for positional markers before the text is
 * sent to a model, then restored afterwards:
 *
 * - placeholders become `__PH_0__`, `__PH_1__`, ...
 * - tags become `__TAG_0__`, `__TAG_1__`, ...
 *
 * Token lists are deduplicated and sorted so the same source always masks
 * to the same text, which keeps cache keys stable.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::errors::TranslationError;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]+\}").expect("valid placeholder regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

fn unique_sorted(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct `{...}` placeholders in lexicographic order
pub fn extract_placeholders(text: &str) -> Vec<String> {
    unique_sorted(&PLACEHOLDER_RE, text)
}

/// Distinct `<...>` tags in lexicographic order
pub fn extract_tags(text: &str) -> Vec<String> {
    unique_sorted(&TAG_RE, text)
}

/// Source text with protected tokens replaced by markers
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedText {
    /// Text sent to the model
    pub masked: String,
    pub placeholders: Vec<String>,
    pub tags: Vec<String>,
    /// (marker, original) pairs in registration order
    replacements: Vec<(String, String)>,
}

impl MaskedText {
    /// Mask placeholders first, then tags
    pub fn new(source: &str) -> Self {
        let placeholders = extract_placeholders(source);
        let tags = extract_tags(source);

        let mut masked = source.to_string();
        let mut replacements = Vec::with_capacity(placeholders.len() + tags.len());

        for (i, ph) in placeholders.iter().enumerate() {
            let marker = format!("__PH_{}__", i);
            masked = masked.replace(ph.as_str(), &marker);
            replacements.push((marker, ph.clone()));
        }
        for (i, tag) in tags.iter().enumerate() {
            let marker = format!("__TAG_{}__", i);
            masked = masked.replace(tag.as_str(), &marker);
            replacements.push((marker, tag.clone()));
        }

        Self { masked, placeholders, tags, replacements }
    }

    /// Restore original tokens, replaying replacements in reverse order
    pub fn unmask(&self, text: &str) -> String {
        self.replacements
            .iter()
            .rev()
            .fold(text.to_string(), |acc, (marker, original)| acc.replace(marker.as_str(), original))
    }

    /// Check that every source token reappears in a restored translation
    pub fn verify(&self, restored: &str) -> Result<(), TranslationError> {
        if let Some(ph) = self.placeholders.iter().find(|ph| !restored.contains(ph.as_str())) {
            return Err(TranslationError::MissingPlaceholder(ph.clone()));
        }
        if let Some(tag) = self.tags.iter().find(|tag| !restored.contains(tag.as_str())) {
            return Err(TranslationError::MissingTag(tag.clone()));
        }
        Ok(())
    }

    /// Whether any token was masked
    pub fn has_tokens(&self) -> bool {
        !self.replacements.is_empty()
    }
}
