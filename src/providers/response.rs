/*!
 * Structured-output helpers shared by the HTTP adapters.
 *
 * Models asked for `{"translation": "..."}` do not always comply, so
 * extraction walks a fixed sequence of fallbacks before giving up.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::errors::ProviderError;

/// Maximum characters of model output kept in a parse error
const PARSE_ERROR_CONTENT_LIMIT: usize = 2000;

/// Labels stripped from a plain-text answer
const PLAIN_TEXT_LABELS: [&str; 4] = ["translation:", "translated:", "result:", "output:"];

/// A label only counts if it starts within this many bytes
const LABEL_SEARCH_WINDOW: usize = 80;

static TRANSLATION_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"translation"\s*:\s*"(.*?)""#).expect("valid translation field regex")
});

#[derive(Deserialize)]
struct TranslationPayload {
    #[serde(default)]
    translation: String,
}

/// Pull the translated text out of raw model content.
///
/// Order: fenced code block, direct JSON, field regex, outermost `{...}`
/// slice, then plain text when the content holds no `{` at all.
pub fn extract_translation(content: &str) -> Result<String, ProviderError> {
    let mut s = content.trim();

    if let Some(idx) = s.find("```") {
        let rest = &s[idx + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            s = rest[..end].trim();
        }
    }

    if let Some(text) = parse_payload(s) {
        return Ok(text);
    }

    if let Some(text) = match_field(s) {
        return Ok(text);
    }

    if let (Some(start), Some(end)) = (s.find('{'), s.rfind('}')) {
        if end > start {
            let inner = &s[start..=end];
            if let Some(text) = parse_payload(inner).or_else(|| match_field(inner)) {
                return Ok(text);
            }
        }
    }

    if !s.contains('{') {
        let lower = s.to_lowercase();
        for label in PLAIN_TEXT_LABELS {
            if let Some(pos) = lower.find(label) {
                if pos < LABEL_SEARCH_WINDOW {
                    // Lowercasing can shift byte offsets for non-ASCII prefixes
                    let candidate = s.get(pos + label.len()..).unwrap_or("").trim();
                    if !candidate.is_empty() {
                        return Ok(candidate.to_string());
                    }
                }
            }
        }
        if !s.is_empty() {
            return Ok(s.to_string());
        }
    }

    Err(ProviderError::Parse(abbreviate(s, PARSE_ERROR_CONTENT_LIMIT)))
}

fn parse_payload(s: &str) -> Option<String> {
    serde_json::from_str::<TranslationPayload>(s)
        .ok()
        .map(|p| p.translation)
        .filter(|t| !t.is_empty())
}

fn match_field(s: &str) -> Option<String> {
    TRANSLATION_FIELD_RE
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("\\n", "\n").replace("\\\"", "\""))
}

/// Truncate to at most `max` characters, ending with `...` when cut
pub fn abbreviate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

/// Build an OpenRouter endpoint URL whether or not the base already holds `/api/v1`
pub fn openrouter_url(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches('/');
    match base.find("/api/v1") {
        Some(idx) => format!("{}{}", &base[..idx + "/api/v1".len()], tail),
        None => format!("{}/api/v1{}", base, tail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractTranslation_withPlainJson_shouldReturnField() {
        let out = extract_translation(r#"{"translation": "Bonjour"}"#).unwrap();
        assert_eq!(out, "Bonjour");
    }

    #[test]
    fn test_extractTranslation_withFencedBlock_shouldUnwrap() {
        let content = "Here you go:\n```json\n{\"translation\": \"Hallo Welt\"}\n```";
        assert_eq!(extract_translation(content).unwrap(), "Hallo Welt");
    }

    #[test]
    fn test_extractTranslation_withBrokenJson_shouldUseRegex() {
        let content = r#"{"translation": "Ciao", "notes": }"#;
        assert_eq!(extract_translation(content).unwrap(), "Ciao");
    }

    #[test]
    fn test_extractTranslation_withSurroundingText_shouldParseSlice() {
        let content = "Sure! {\"translation\": \"Hola\"} Hope it helps.";
        assert_eq!(extract_translation(content).unwrap(), "Hola");
    }

    #[test]
    fn test_extractTranslation_withLabel_shouldStripIt() {
        assert_eq!(extract_translation("Translation: Guten Tag").unwrap(), "Guten Tag");
    }

    #[test]
    fn test_extractTranslation_withPlainText_shouldAcceptAsIs() {
        assert_eq!(extract_translation("  Merci  ").unwrap(), "Merci");
    }

    #[test]
    fn test_extractTranslation_withEmptyContent_shouldBeParseError() {
        let err = extract_translation("   ").unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_extractTranslation_withUnusableObject_shouldBeParseError() {
        let err = extract_translation(r#"{"text": "nope"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(ref c) if c.contains("nope")));
    }

    #[test]
    fn test_abbreviate_shouldCapLength() {
        assert_eq!(abbreviate("abcdef", 10), "abcdef");
        assert_eq!(abbreviate("abcdefghij", 6), "abc...");
        assert_eq!(abbreviate("abcdef", 2), "ab");
    }

    #[test]
    fn test_openrouterUrl_shouldNotDuplicateApiPrefix() {
        assert_eq!(
            openrouter_url("https://openrouter.ai", "/models"),
            "https://openrouter.ai/api/v1/models"
        );
        assert_eq!(
            openrouter_url("https://openrouter.ai/api/v1/", "/chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            openrouter_url("https://proxy.local/api/v1/extra", "/models"),
            "https://proxy.local/api/v1/models"
        );
    }
}
