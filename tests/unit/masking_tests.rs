/*!
 * Tests for placeholder and tag masking
 */

use locail::translation::masking::{extract_placeholders, MaskedText};

#[test]
fn test_mask_withMixedTokens_shouldHideEveryRawToken() {
    let source = "<b>{count}</b> new messages for {user}";
    let masked = MaskedText::new(source);

    assert!(!masked.masked.contains('{'));
    assert!(!masked.masked.contains('<'));
    assert_eq!(masked.placeholders, vec!["{count}", "{user}"]);
    assert_eq!(masked.tags, vec!["</b>", "<b>"]);
    assert!(masked.has_tokens());
}

#[test]
fn test_unmask_withReorderedMarkers_shouldRestoreTokens() {
    let masked = MaskedText::new("Hello {name}, you have {count} items");
    let translated = "__PH_0__ articles pour __PH_1__";

    let restored = masked.unmask(translated);

    assert_eq!(restored, "{count} articles pour {name}");
    assert!(masked.verify(&restored).is_ok());
}

#[test]
fn test_mask_withSameTokensInDifferentOrder_shouldProduceSameMarkers() {
    let first = MaskedText::new("{b} then {a}");
    let second = MaskedText::new("{a} then {b}");

    assert_eq!(first.placeholders, second.placeholders);
    assert_eq!(first.masked, "__PH_1__ then __PH_0__");
    assert_eq!(second.masked, "__PH_0__ then __PH_1__");
}

#[test]
fn test_extractPlaceholders_withUnclosedBrace_shouldIgnoreIt() {
    assert!(extract_placeholders("price {amount").is_empty());
    assert_eq!(extract_placeholders("{a}{a}{b}"), vec!["{a}", "{b}"]);
}
