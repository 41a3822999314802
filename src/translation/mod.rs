/*!
 * Caption translation pipeline.
 *
 * - `batch`: Batching, bounded concurrency, retry of missing entries and reassembly
 * - `events`: Progress signals reported to the caller
 * - `concurrency`: Per-backend defaults and configuration ceilings
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOptions, BatchTranslator, RetryPolicy, split_into_batches};
pub use self::events::{NoopObserver, ProgressObserver, TranslationEvent};

// Submodules
pub mod batch;
pub mod concurrency;
pub mod events;
