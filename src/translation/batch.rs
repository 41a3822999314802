/*!
 * Batch translation processing.
 *
 * Captions are split into fixed-size batches which are translated
 * concurrently, with at most `max_concurrency` backend calls in flight.
 * Entries a backend leaves out of its answer are retried on their own until
 * every entry of the batch is accounted for or the retry budget runs out.
 * Results are matched back to the input by id, so completion order never
 * affects the output order.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::errors::TranslationError;
use crate::providers::TranslationBackend;
use crate::subtitle_processor::{Caption, TranslationUnit};

use super::events::{ProgressObserver, TranslationEvent};

/// How entries missing from a backend answer are retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries per batch after the first call; `None` retries until nothing is missing
    pub max_retries: Option<u32>,

    /// Delay before the first retry, doubled on each following one (0 disables waiting)
    pub backoff_base_ms: u64,

    /// Upper bound for a single delay
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Retry immediately until every entry is returned
    pub fn unbounded() -> Self {
        Self {
            max_retries: None,
            backoff_base_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if self.backoff_base_ms == 0 || attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2u64.saturating_pow(attempt - 1);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor).min(self.max_backoff_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Some(10),
            backoff_base_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

/// Resolved settings for one translation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum number of captions per backend call
    pub batch_size: usize,

    /// Maximum number of batches translated at the same time
    pub max_concurrency: usize,

    /// Source language code
    pub source_language: String,

    /// Target language code
    pub target_language: String,

    /// Handling of entries the backend leaves out
    pub retry: RetryPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_concurrency: 10,
            source_language: "en".to_string(),
            target_language: "nl".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Split units into contiguous batches of at most `batch_size` entries.
///
/// A size of zero is treated as one.
pub fn split_into_batches(units: &[TranslationUnit], batch_size: usize) -> Vec<Vec<TranslationUnit>> {
    units.chunks(batch_size.max(1)).map(<[TranslationUnit]>::to_vec).collect()
}

// Entries of `batch` whose id appears nowhere in `results`.
fn missing_units(batch: &[TranslationUnit], results: &[TranslationUnit]) -> Vec<TranslationUnit> {
    let returned: HashSet<&str> = results.iter().map(|unit| unit.id.as_str()).collect();
    batch.iter()
        .filter(|unit| !returned.contains(unit.id.as_str()))
        .cloned()
        .collect()
}

/// Batch translator for processing captions in batches
pub struct BatchTranslator {
    /// Backend doing the actual translation
    backend: Arc<dyn TranslationBackend>,

    /// Run settings
    options: BatchOptions,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(backend: Arc<dyn TranslationBackend>, options: BatchOptions) -> Self {
        Self { backend, options }
    }

    /// Translate captions, returning one caption per input in input order.
    ///
    /// Only `text` changes. A caption without a translation keeps its
    /// original text and is reported through a `TranslationEvent::Error`.
    /// A hard backend failure aborts the whole call; batches still running
    /// are dropped.
    pub async fn translate(
        &self,
        captions: &[Caption],
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<Caption>, TranslationError> {
        let units: Vec<TranslationUnit> = captions.iter().map(Caption::to_unit).collect();
        let batches = split_into_batches(&units, self.options.batch_size);
        let total_batches = batches.len();
        let max_concurrency = self.options.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);

        observer.on_event(&TranslationEvent::Started {
            caption_count: captions.len(),
            batch_count: total_batches,
        });
        info!(
            "Translating {} captions in {} batches ({} -> {}) with {} (max {} concurrent)",
            captions.len(),
            total_batches,
            self.options.source_language,
            self.options.target_language,
            self.backend.name(),
            max_concurrency
        );

        let start_time = Instant::now();
        let semaphore = Semaphore::new(max_concurrency);
        let completed = AtomicUsize::new(0);
        let semaphore = &semaphore;
        let completed = &completed;

        let results: Vec<Vec<TranslationUnit>> = stream::iter(batches.iter().enumerate())
            .map(|(batch_index, batch)| async move {
                let _permit = semaphore.acquire().await?;

                let batch_start = Instant::now();
                let result = self.translate_batch_with_retry(batch_index, batch).await;

                match &result {
                    Ok(_) => {
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        debug!("Batch {} of {} completed in {:?}", batch_index + 1, total_batches, batch_start.elapsed());
                        observer.on_event(&TranslationEvent::BatchCompleted {
                            completed: done,
                            total: total_batches,
                        });
                    }
                    Err(e) => error!("{}", e),
                }

                result
            })
            .buffer_unordered(max_concurrency)
            .try_collect()
            .await?;

        let duration = start_time.elapsed();
        observer.on_event(&TranslationEvent::Finished { duration });
        info!("All {} batches settled in {:?}", total_batches, duration);

        Ok(Self::reassemble(captions, &results, observer))
    }

    // First translation seen for an id wins.
    fn reassemble(
        captions: &[Caption],
        results: &[Vec<TranslationUnit>],
        observer: &dyn ProgressObserver,
    ) -> Vec<Caption> {
        let mut translated: HashMap<&str, &str> = HashMap::new();
        for unit in results.iter().flatten() {
            translated.entry(unit.id.as_str()).or_insert(unit.text.as_str());
        }

        captions.iter()
            .map(|caption| match translated.get(caption.id()) {
                Some(text) => caption.with_text(*text),
                None => {
                    let message = format!("No translation received for caption {}, keeping original text", caption.id());
                    error!("{}", message);
                    observer.on_event(&TranslationEvent::Error {
                        id: caption.id().to_string(),
                        message,
                    });
                    caption.clone()
                }
            })
            .collect()
    }

    /// Translate one batch, re-requesting only the entries left out.
    ///
    /// Missing entries are always computed against the whole batch and every
    /// result gathered so far.
    async fn translate_batch_with_retry(
        &self,
        batch_index: usize,
        batch: &[TranslationUnit],
    ) -> Result<Vec<TranslationUnit>, TranslationError> {
        let mut results = self.request(batch_index, batch).await?;
        let mut missing = missing_units(batch, &results);
        let mut attempt: u32 = 0;

        while !missing.is_empty() {
            if let Some(max_retries) = self.options.retry.max_retries {
                if attempt >= max_retries {
                    warn!(
                        "Batch {}: {} of {} entries still missing after {} retries",
                        batch_index + 1,
                        missing.len(),
                        batch.len(),
                        attempt
                    );
                    break;
                }
            }

            attempt += 1;
            let delay = self.options.retry.backoff_for(attempt);
            debug!(
                "Batch {}: retrying {} missing entries (attempt {}, waiting {:?})",
                batch_index + 1,
                missing.len(),
                attempt,
                delay
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let retried = self.request(batch_index, &missing).await?;
            results.extend(retried);
            missing = missing_units(batch, &results);
        }

        Ok(results)
    }

    // One backend call; answers for ids that were not asked for are discarded.
    async fn request(
        &self,
        batch_index: usize,
        units: &[TranslationUnit],
    ) -> Result<Vec<TranslationUnit>, TranslationError> {
        let response = self.backend
            .translate(units, &self.options.source_language, &self.options.target_language)
            .await
            .map_err(|source| TranslationError::BatchFailed {
                batch: batch_index,
                source,
            })?;

        let requested: HashSet<&str> = units.iter().map(|unit| unit.id.as_str()).collect();
        let (kept, unknown): (Vec<TranslationUnit>, Vec<TranslationUnit>) = response
            .into_iter()
            .partition(|unit| requested.contains(unit.id.as_str()));

        if !unknown.is_empty() {
            warn!(
                "Batch {}: ignoring {} entries with ids that were not requested",
                batch_index + 1,
                unknown.len()
            );
        }

        Ok(kept)
    }
}
