/*!
 * Tests for application configuration
 */

use anyhow::Result;
use subtrans::app_config::{BackendConfig, BackendKind, Config, LogLevel};
use subtrans::translation::concurrency::{MAX_BATCH_SIZE, MAX_CONCURRENCY};
use subtrans::{LineEnding, RetryPolicy};
use crate::common;

fn valid_config() -> Config {
    let mut config = Config::default();
    config.translation.backend.set_api_key("sk-test");
    config
}

/// Test default configuration values
#[test]
fn test_default_config_shouldHaveExpectedValues() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "nl");
    assert_eq!(config.translation.backend.kind(), BackendKind::OpenAI);
    assert_eq!(config.translation.backend.model(), "gpt-4o-mini");
    assert_eq!(config.translation.batch_size, None);
    assert_eq!(config.translation.max_concurrency, None);
    assert_eq!(config.translation.retry.max_retries, Some(10));
    assert_eq!(config.log_level, LogLevel::Info);
}

/// The default OpenAI backend needs a key before it validates
#[test]
fn test_validate_withMissingApiKey_shouldFail() {
    let error = Config::default().validate().unwrap_err();
    assert!(error.to_string().contains("API key"));
    assert!(valid_config().validate().is_ok());
}

/// Ollama does not need a key
#[test]
fn test_validate_withOllamaBackend_shouldNotRequireKey() {
    let mut config = Config::default();
    config.translation.backend = BackendConfig::new(BackendKind::Ollama);
    assert!(config.validate().is_ok());
}

/// Language codes are checked
#[test]
fn test_validate_withInvalidLanguage_shouldFail() {
    let mut config = valid_config();
    config.target_language = "zz".to_string();
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.source_language = "123".to_string();
    assert!(config.validate().is_err());
}

/// Batch size and concurrency must fall in their ranges
#[test]
fn test_validate_withOutOfRangeLimits_shouldFail() {
    let mut config = valid_config();
    config.translation.batch_size = Some(0);
    assert!(config.validate().is_err());
    config.translation.batch_size = Some(MAX_BATCH_SIZE + 1);
    assert!(config.validate().is_err());
    config.translation.batch_size = Some(MAX_BATCH_SIZE);
    assert!(config.validate().is_ok());

    config.translation.max_concurrency = Some(0);
    assert!(config.validate().is_err());
    config.translation.max_concurrency = Some(MAX_CONCURRENCY + 1);
    assert!(config.validate().is_err());
    config.translation.max_concurrency = Some(1);
    assert!(config.validate().is_ok());
}

/// Backends are selected by their `type` tag with per-field defaults
#[test]
fn test_deserialize_withTaggedBackend_shouldFillDefaults() -> Result<()> {
    let json = r#"{
        "target_language": "fr",
        "translation": {
            "backend": { "type": "ollama", "model": "mistral" },
            "batch_size": 25,
            "retry": { "max_retries": null, "retry_backoff_ms": 0 }
        },
        "subtitle": { "line_ending": "crlf" },
        "log_level": "debug"
    }"#;
    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    match &config.translation.backend {
        BackendConfig::Ollama { model, endpoint, timeout_secs, .. } => {
            assert_eq!(model, "mistral");
            assert_eq!(endpoint, "http://localhost:11434");
            assert_eq!(*timeout_secs, 300);
        }
        other => panic!("Expected Ollama backend, got {:?}", other),
    }
    assert_eq!(config.translation.batch_size, Some(25));
    assert_eq!(config.translation.retry.max_retries, None);
    assert_eq!(config.translation.retry.max_backoff_ms, 30_000);
    assert_eq!(config.subtitle.line_ending, LineEnding::CrLf);
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

/// An unknown backend tag is rejected
#[test]
fn test_deserialize_withUnknownBackend_shouldFail() {
    let json = r#"{ "translation": { "backend": { "type": "telepathy" } } }"#;
    assert!(serde_json::from_str::<Config>(json).is_err());
}

/// Saved configurations load back unchanged
#[test]
fn test_save_thenFromFile_shouldRoundTrip() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    let mut config = valid_config();
    config.target_language = "de".to_string();
    config.translation.max_concurrency = Some(4);

    config.save(&path)?;
    let loaded = Config::from_file(&path)?;

    assert_eq!(loaded, config);
    Ok(())
}

/// Missing or broken files are reported
#[test]
fn test_from_file_withMissingOrInvalidFile_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    assert!(Config::from_file(dir.path().join("absent.json")).is_err());

    let broken = common::create_test_file(dir.path(), "broken.json", "{ not json")?;
    assert!(Config::from_file(broken).is_err());
    Ok(())
}

/// Unset limits fall back to the backend profile
#[test]
fn test_batch_options_withoutOverrides_shouldUseBackendProfile() {
    let openai = valid_config().batch_options();
    assert_eq!(openai.batch_size, 500);
    assert_eq!(openai.max_concurrency, 10);
    assert_eq!(openai.retry, RetryPolicy::default());

    let mut config = Config::default();
    config.translation.backend = BackendConfig::new(BackendKind::Ollama);
    let ollama = config.batch_options();
    assert_eq!(ollama.batch_size, 50);
    assert_eq!(ollama.max_concurrency, 2);
}

/// Explicit limits win over the profile
#[test]
fn test_batch_options_withOverrides_shouldUseThem() {
    let mut config = valid_config();
    config.target_language = "es".to_string();
    config.translation.batch_size = Some(7);
    config.translation.max_concurrency = Some(3);
    config.translation.retry.max_retries = Some(2);

    let options = config.batch_options();
    assert_eq!(options.batch_size, 7);
    assert_eq!(options.max_concurrency, 3);
    assert_eq!(options.target_language, "es");
    assert_eq!(options.retry.max_retries, Some(2));
}

/// Backend kinds print their config tag
#[test]
fn test_backend_kind_display_shouldMatchConfigTag() -> Result<()> {
    for kind in [BackendKind::OpenAI, BackendKind::Ollama] {
        let tag = serde_json::to_value(BackendConfig::new(kind))?["type"].clone();
        assert_eq!(tag, kind.to_string());
    }
    Ok(())
}

/// Model and key setters touch the right variant
#[test]
fn test_backend_setters_shouldUpdateFields() {
    let mut backend = BackendConfig::new(BackendKind::Ollama);
    backend.set_model("qwen2.5");
    backend.set_api_key("ignored");
    assert_eq!(backend.model(), "qwen2.5");
    assert_eq!(backend, BackendConfig::Ollama {
        model: "qwen2.5".to_string(),
        endpoint: "http://localhost:11434".to_string(),
        timeout_secs: 300,
        temperature: 0.3,
    });
}
