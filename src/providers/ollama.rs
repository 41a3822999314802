use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::subtitle_processor::TranslationUnit;
use super::payload::{self, DEFAULT_SYSTEM_PROMPT};
use super::{TranslationBackend, status_error, transport_error};

/// Ollama client for interacting with the Ollama chat API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model name
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// System prompt template with language placeholders
    system_prompt: String,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Generation options for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Format to return a response in
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: None,
            format: None,
            stream: Some(false),
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }

    /// Constrain the answer to valid JSON
    pub fn json_format(mut self) -> Self {
        self.format = Some("json".to_string());
        self
    }
}

/// Chat response from the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model name
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    pub done: bool,
}

impl Ollama {
    /// Create a new Ollama client; the timeout applies to every request
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            // Ollama speaks HTTP/1.1 only
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ProviderError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint: String = endpoint.into();
        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            client,
            model: model.into(),
            temperature: 0.3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Send a chat request
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self.client.post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(status_error(status.as_u16(), error_text));
        }

        response.json::<ChatResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama API response: {}", e)))
    }
}

#[async_trait]
impl TranslationBackend for Ollama {
    async fn translate(
        &self,
        units: &[TranslationUnit],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<TranslationUnit>, ProviderError> {
        if units.is_empty() {
            return Ok(Vec::new());
        }

        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: payload::render_system_prompt(&self.system_prompt, source_language, target_language),
            },
            ChatMessage {
                role: "user".to_string(),
                content: payload::build_user_message(units)?,
            },
        ];
        let request = ChatRequest::new(&self.model, messages)
            .temperature(self.temperature)
            .json_format();

        debug!("Sending {} entries to Ollama model {}", units.len(), self.model);
        let response = self.chat(request).await?;
        payload::parse_translations(&response.message.content, units)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
