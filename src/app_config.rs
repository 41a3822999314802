use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::providers::payload::DEFAULT_SYSTEM_PROMPT;
use crate::subtitle_processor::LineEnding;
use crate::translation::concurrency::{MAX_BATCH_SIZE, MAX_CONCURRENCY, ProviderProfile};
use crate::translation::{BatchOptions, RetryPolicy};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Subtitle output config
    #[serde(default)]
    pub subtitle: SubtitleConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    // @provider: OpenAI
    OpenAI,
    // @provider: Ollama
    Ollama,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Backend selection with the settings that belong to it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// OpenAI API or any OpenAI-compatible server
    OpenAI {
        /// Model name (e.g., "gpt-4o-mini")
        #[serde(default = "default_openai_model")]
        model: String,

        /// API key for the service
        #[serde(default = "String::new")]
        api_key: String,

        /// Service endpoint URL (for Azure OpenAI or self-hosted)
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,

        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,

        /// Temperature parameter for text generation (0.0 to 1.0)
        #[serde(default = "default_temperature")]
        temperature: f32,
    },

    /// Local Ollama server
    Ollama {
        /// Model name (e.g., "llama3.2")
        #[serde(default = "default_ollama_model")]
        model: String,

        /// Service endpoint URL
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,

        /// Request timeout in seconds
        #[serde(default = "default_ollama_timeout_secs")]
        timeout_secs: u64,

        /// Temperature parameter for text generation (0.0 to 1.0)
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
}

impl BackendConfig {
    // @param kind: Backend enum
    // @returns: Backend config with defaults
    pub fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::OpenAI => Self::OpenAI {
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                timeout_secs: default_timeout_secs(),
                temperature: default_temperature(),
            },
            BackendKind::Ollama => Self::Ollama {
                model: default_ollama_model(),
                endpoint: default_ollama_endpoint(),
                timeout_secs: default_ollama_timeout_secs(),
                temperature: default_temperature(),
            },
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::OpenAI { .. } => BackendKind::OpenAI,
            Self::Ollama { .. } => BackendKind::Ollama,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn set_model(&mut self, new_model: impl Into<String>) {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => *model = new_model.into(),
        }
    }

    /// Set the API key; backends without authentication ignore it
    pub fn set_api_key(&mut self, new_key: impl Into<String>) {
        if let Self::OpenAI { api_key, .. } = self {
            *api_key = new_key.into();
        }
    }

    fn timeout_secs(&self) -> u64 {
        match self {
            Self::OpenAI { timeout_secs, .. } | Self::Ollama { timeout_secs, .. } => *timeout_secs,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(BackendKind::OpenAI)
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: BackendConfig,

    /// Captions per backend call; the backend profile decides when unset
    #[serde(default)]
    pub batch_size: Option<usize>,

    /// Concurrent backend calls; the backend profile decides when unset
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry settings for entries a backend leaves out
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            batch_size: None,
            max_concurrency: None,
            system_prompt: default_system_prompt(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry settings for missing entries
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries per batch; `null` retries until every entry is returned
    #[serde(default = "default_retry_count")]
    pub max_retries: Option<u32>,

    /// Backoff before the first retry in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Longest single backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }
}

/// Configuration for subtitle output
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SubtitleConfig {
    /// Line terminator for written files; the host convention by default
    #[serde(default)]
    pub line_ending: LineEnding,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "nl".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_ollama_timeout_secs() -> u64 {
    300 // local models can take minutes on large batches
}

fn default_retry_count() -> Option<u32> {
    Some(10)
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        if let Some(batch_size) = self.translation.batch_size {
            if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
                return Err(anyhow!("batch_size must be between 1 and {}, got {}", MAX_BATCH_SIZE, batch_size));
            }
        }

        if let Some(max_concurrency) = self.translation.max_concurrency {
            if !(1..=MAX_CONCURRENCY).contains(&max_concurrency) {
                return Err(anyhow!("max_concurrency must be between 1 and {}, got {}", MAX_CONCURRENCY, max_concurrency));
            }
        }

        if self.translation.backend.timeout_secs() == 0 {
            return Err(anyhow!("Backend timeout must be at least 1 second"));
        }

        if let BackendConfig::OpenAI { api_key, .. } = &self.translation.backend {
            if api_key.trim().is_empty() {
                return Err(anyhow!("Translation API key is required for OpenAI backend"));
            }
        }

        Ok(())
    }

    /// Resolve the settings handed to the batch translator
    pub fn batch_options(&self) -> BatchOptions {
        let profile = ProviderProfile::for_backend(&self.translation.backend);

        BatchOptions {
            batch_size: profile.effective_batch_size(self.translation.batch_size),
            max_concurrency: profile.effective_concurrent_requests(self.translation.max_concurrency),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            retry: RetryPolicy::from(&self.translation.retry),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            subtitle: SubtitleConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
