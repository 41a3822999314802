/*!
 * # subtrans - batched subtitle translation
 *
 * A Rust library for translating SRT subtitles through pluggable translation
 * backends.
 *
 * ## Features
 *
 * - Lenient SRT parsing (comma or period milliseconds, malformed field widths)
 * - Fixed-size batching with a cap on concurrent backend calls
 * - Re-requesting only the entries a backend left out of its answer
 * - Output order and timings always follow the input
 * - Progress signals through an observer passed into each call
 * - Backends:
 *   - OpenAI API (and compatible servers)
 *   - Ollama (local LLM)
 *   - Any async closure via `providers::FnBackend`
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `subtitle_processor`: SRT parsing and serialization
 * - `translation`: Batch scheduling:
 *   - `translation::batch`: Batching, concurrency, retries and reassembly
 *   - `translation::events`: Progress signals
 *   - `translation::concurrency`: Per-backend defaults and ceilings
 * - `providers`: The backend trait and its implementations
 * - `app_config`: Configuration management
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod subtitle_processor;
pub mod translation;
pub mod language_utils;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use subtitle_processor::{Caption, LineEnding, SubtitleCodec, TranslationUnit};
pub use translation::{BatchOptions, BatchTranslator, ProgressObserver, RetryPolicy, TranslationEvent};
pub use providers::TranslationBackend;
pub use errors::{ProviderError, SubtitleError, TranslationError};
