/*!
 * Error types for the subtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with translation backends
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),
    
    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
    
    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError { 
        /// HTTP status code 
        status_code: u16, 
        /// Error message from the API
        message: String 
    },
    
    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),
    
    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    
    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Backend could not be built from its configuration
    #[error("Invalid backend configuration: {0}")]
    Configuration(String),
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// The input did not contain a single recognizable cue
    #[error("No captions found in {0}")]
    NoCaptions(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A backend call failed hard while translating one batch
    #[error("Batch {batch} failed: {source}")]
    BatchFailed {
        /// Zero-based index of the failing batch
        batch: usize,
        /// The backend failure
        #[source]
        source: ProviderError,
    },

    /// The concurrency gate was closed while batches were waiting on it
    #[error("Concurrency gate closed: {0}")]
    GateClosed(#[from] tokio::sync::AcquireError),
}
