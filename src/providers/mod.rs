/*!
 * Translation backend implementations.
 *
 * The batch scheduler only sees the `TranslationBackend` trait. Concrete
 * backends live in submodules:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and compatible servers
 * - Mock: In-process backend for tests
 */

use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;

use crate::app_config::BackendConfig;
use crate::errors::ProviderError;
use crate::subtitle_processor::TranslationUnit;

/// Common trait for all translation backends
///
/// A backend receives a list of units and returns translated units for some
/// subset of their ids. Leaving an id out of the response is the sanctioned
/// way to say "not translated this round"; returning an error is reserved for
/// hard failures such as network, authentication or malformed responses.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Translate `units` from `source_language` to `target_language`
    ///
    /// # Returns
    /// * `Result<Vec<TranslationUnit>, ProviderError>` - Translated units, keyed by the input ids
    async fn translate(
        &self,
        units: &[TranslationUnit],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<TranslationUnit>, ProviderError>;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}

/// Backend built from a plain async function or closure
pub struct FnBackend<F> {
    name: String,
    func: F,
}

impl<F> FnBackend<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnBackend<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackend").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> TranslationBackend for FnBackend<F>
where
    F: Fn(Vec<TranslationUnit>, String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<TranslationUnit>, ProviderError>> + Send,
{
    async fn translate(
        &self,
        units: &[TranslationUnit],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<TranslationUnit>, ProviderError> {
        (self.func)(units.to_vec(), source_language.to_string(), target_language.to_string()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the backend selected by the configuration
pub fn create_backend(
    config: &BackendConfig,
    system_prompt: &str,
) -> Result<Arc<dyn TranslationBackend>, ProviderError> {
    match config {
        BackendConfig::OpenAI { model, api_key, endpoint, timeout_secs, temperature } => {
            if api_key.trim().is_empty() {
                return Err(ProviderError::Configuration("OpenAI backend requires an API key".to_string()));
            }
            let backend = openai::OpenAI::new(api_key, endpoint, model, *timeout_secs)?
                .with_temperature(*temperature)
                .with_system_prompt(system_prompt);
            Ok(Arc::new(backend))
        }
        BackendConfig::Ollama { model, endpoint, timeout_secs, temperature } => {
            let backend = ollama::Ollama::new(endpoint, model, *timeout_secs)?
                .with_temperature(*temperature)
                .with_system_prompt(system_prompt);
            Ok(Arc::new(backend))
        }
    }
}

/// Map a non-success HTTP status to the matching provider error
pub(crate) fn status_error(status_code: u16, message: String) -> ProviderError {
    match status_code {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        _ => ProviderError::ApiError { status_code, message },
    }
}

/// Map a transport-level failure to the matching provider error
pub(crate) fn transport_error(backend: &str, error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", backend, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", backend, error))
    }
}

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod payload;
