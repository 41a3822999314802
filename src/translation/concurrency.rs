/*!
 * Backend-specific concurrency tuning.
 *
 * This module provides default batch and concurrency settings per backend
 * kind, plus the ceilings callers enforce before handing values to the
 * scheduler.
 */

use crate::app_config::BackendConfig;

/// Largest batch size a caller may configure
pub const MAX_BATCH_SIZE: usize = 1000;

/// Largest number of concurrent batches a caller may configure
pub const MAX_CONCURRENCY: usize = 50;

/// Backend-specific profile with tuned defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Maximum concurrent batch requests
    pub max_concurrent_requests: usize,
    /// Recommended number of captions per batch
    pub recommended_batch_size: usize,
}

impl ProviderProfile {
    /// Get the profile for a configured backend
    pub fn for_backend(backend: &BackendConfig) -> Self {
        match backend {
            BackendConfig::OpenAI { .. } => Self {
                // Hosted, large context and good throughput
                max_concurrent_requests: 10,
                recommended_batch_size: 500,
            },
            BackendConfig::Ollama { .. } => Self {
                // Local models serve few requests at once and lose entries in long answers
                max_concurrent_requests: 2,
                recommended_batch_size: 50,
            },
        }
    }

    /// Effective batch size, respecting any user override
    pub fn effective_batch_size(&self, user_override: Option<usize>) -> usize {
        user_override.unwrap_or(self.recommended_batch_size)
    }

    /// Effective concurrency, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override.unwrap_or(self.max_concurrent_requests)
    }
}
