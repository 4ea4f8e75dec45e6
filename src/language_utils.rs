use anyhow::{anyhow, Result};
use isolang::Language;

/// Language utilities for locale handling
///
/// Locales arrive as ISO 639 codes with an optional region suffix
/// (`fr`, `pt-BR`, `zh_Hant`). Only the language part is validated;
/// the region is carried through untouched.

/// ISO 639-2/B codes that differ from their 639-2/T form
const PART2B_TO_PART2T: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Split a locale into its language and optional region parts
pub fn split_locale(locale: &str) -> (String, Option<String>) {
    let trimmed = locale.trim();
    match trimmed.split_once(['-', '_']) {
        Some((lang, region)) if !region.is_empty() => {
            (lang.to_lowercase(), Some(region.to_string()))
        }
        Some((lang, _)) => (lang.to_lowercase(), None),
        None => (trimmed.to_lowercase(), None),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some((_, t)) = PART2B_TO_PART2T.iter().find(|(b, _)| *b == normalized_code) {
                return Ok(t.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Validate the language part of a locale
pub fn validate_locale(locale: &str) -> Result<()> {
    let (lang, _) = split_locale(locale);
    normalize_to_part2t(&lang)
        .map(|_| ())
        .map_err(|_| anyhow!("Invalid locale: {}", locale))
}

/// Check if two locales share the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let (lang1, _) = split_locale(code1);
    let (lang2, _) = split_locale(code2);
    match (normalize_to_part2t(&lang1), normalize_to_part2t(&lang2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Human-readable name for prompts: `pt-BR` becomes `Portuguese (BR)`.
///
/// Unknown codes are returned as given.
pub fn display_name(locale: &str) -> String {
    let (lang, region) = split_locale(locale);
    match get_language_name(&lang) {
        Ok(name) => match region {
            Some(region) => format!("{} ({})", name, region),
            None => name,
        },
        Err(_) => locale.trim().to_string(),
    }
}
