use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language utilities for slug and locale handling
///
/// This module validates the slug and locale grammars and maps the language
/// part of a locale to ISO 639 data.
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap());

/// language[_REGION][_variant], e.g. `en`, `pt_BR`, `de_DE_formal`
static LOCALE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(?:_[A-Z]{2})?(?:_[a-z0-9]+)?$").unwrap());

/// Check a language slug against `[a-z][a-z0-9_-]*`
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Check a locale against the locale grammar
pub fn is_valid_locale(locale: &str) -> bool {
    LOCALE_RE.is_match(locale)
}

/// Language part of a locale (`pt_BR` -> `pt`)
pub fn language_part(locale: &str) -> &str {
    locale.split('_').next().unwrap_or(locale)
}

/// W3C form of a locale (`pt_BR` -> `pt-BR`)
pub fn locale_to_w3c(locale: &str) -> String {
    locale.replace('_', "-")
}

/// Slug derived from a locale when the requested slug is taken
pub fn locale_as_slug(locale: &str) -> String {
    locale.to_lowercase()
}

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-3 (3-letter) code
    Part3,
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-3 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if normalized_code.len() == 3 && Language::from_639_3(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part3);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    }
}

/// English name of the language of a locale
pub fn get_language_name(locale: &str) -> Result<String> {
    let lang = lookup(language_part(locale))
        .ok_or_else(|| anyhow!("Failed to get language from locale: {}", locale))?;
    Ok(lang.to_name().to_string())
}

/// Autonym of the language of a locale, when isolang knows it
pub fn get_native_name(locale: &str) -> Option<String> {
    lookup(language_part(locale))
        .and_then(|lang| lang.to_autonym())
        .map(|name| name.to_string())
}
