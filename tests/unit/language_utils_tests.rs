/*!
 * Tests for language utility functions
 */

use subtrans::language_utils::{get_language_name, language_codes_match, normalize_to_part2t, validate_language_code, LanguageCodeType};

/// Test validation of language codes
#[test]
fn test_validate_language_code_withValidCodes_shouldReturnCorrectType() {
    // ISO 639-1 tests
    assert!(matches!(validate_language_code("en").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code("nl").unwrap(), LanguageCodeType::Part1));

    // ISO 639-2/T tests
    assert!(matches!(validate_language_code("eng").unwrap(), LanguageCodeType::Part2T));
    assert!(matches!(validate_language_code("fra").unwrap(), LanguageCodeType::Part2T));

    // ISO 639-2/B tests
    assert!(matches!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B));
    assert!(matches!(validate_language_code("ger").unwrap(), LanguageCodeType::Part2B));

    // Whitespace and case tests
    assert!(matches!(validate_language_code(" EN ").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code("ENG").unwrap(), LanguageCodeType::Part2T));
}

/// Invalid codes are rejected
#[test]
fn test_validate_language_code_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("123").is_err());
    assert!(validate_language_code("e").is_err());
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("english").is_err());
}

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("nl").unwrap(), "nld");
    assert_eq!(normalize_to_part2t("fra").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t(" DE ").unwrap(), "deu");
}

/// Test language code matching across code types
#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("DE", "ger"));
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("en", "123"));
}

/// Test language names used in prompts
#[test]
fn test_get_language_name_withValidCodes_shouldReturnEnglishName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("nld").unwrap(), "Dutch");
    assert_eq!(get_language_name("fre").unwrap(), "French");
    assert!(get_language_name("123").is_err());
}
