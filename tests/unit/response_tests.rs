/*!
 * Tests for model output extraction
 */

use locail::errors::ProviderError;
use locail::providers::response::{extract_translation, openrouter_url};

#[test]
fn test_extractTranslation_withMarkersAndEscapes_shouldKeepThem() {
    let content = r#"{"translation": "Bonjour __PH_0__,\n\"ami\""}"#;
    assert_eq!(extract_translation(content).unwrap(), "Bonjour __PH_0__,\n\"ami\"");
}

#[test]
fn test_extractTranslation_withFencedJsonAndProse_shouldUnwrap() {
    let content = "Here you go:\n```json\n{\"translation\": \"Hallo\"}\n```\nEnjoy!";
    assert_eq!(extract_translation(content).unwrap(), "Hallo");
}

#[test]
fn test_extractTranslation_withWrongField_shouldBeRetryableParseError() {
    let err = extract_translation(r#"{"text": "Hola"}"#).unwrap_err();
    assert!(matches!(err, ProviderError::Parse(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_openrouterUrl_withTrailingSlash_shouldJoinCleanly() {
    assert_eq!(
        openrouter_url("https://openrouter.ai/", "/chat/completions"),
        "https://openrouter.ai/api/v1/chat/completions"
    );
    assert_eq!(
        openrouter_url("https://proxy.local/api/v1/", "/models"),
        "https://proxy.local/api/v1/models"
    );
}
