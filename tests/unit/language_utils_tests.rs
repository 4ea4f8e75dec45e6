/*!
 * Tests for language code utilities
 */

use locail::language_utils::{
    display_name, get_language_name, language_codes_match, normalize_to_part2t, validate_locale,
};

#[test]
fn test_normalizeToPart2t_withTwoLetterCode_shouldReturnThreeLetters() {
    assert_eq!(normalize_to_part2t("de").unwrap(), "deu");
    assert_eq!(normalize_to_part2t(" JA ").unwrap(), "jpn");
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert!(get_language_name("xx").is_err());
}

#[test]
fn test_validateLocale_shouldAcceptRegionSuffixes() {
    assert!(validate_locale("zh_Hant").is_ok());
    assert!(validate_locale("en-US").is_ok());
    assert!(validate_locale("").is_err());
}

#[test]
fn test_languageCodesMatch_withDifferentLanguages_shouldBeFalse() {
    assert!(language_codes_match("fre", "fr-CA"));
    assert!(!language_codes_match("fr", "de"));
}

#[test]
fn test_displayName_withUnknownCode_shouldEchoInput() {
    assert_eq!(display_name("klingon"), "klingon");
    assert_eq!(display_name("es"), "Spanish");
}
