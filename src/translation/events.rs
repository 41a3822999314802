/*!
 * Progress signals emitted while translating.
 *
 * The scheduler reports what it is doing through a `ProgressObserver` passed
 * into each call. Observers are one-directional: nothing is acknowledged and
 * a slow observer only slows the call it was handed to.
 */

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// A single progress signal
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationEvent {
    /// Translation began
    Started {
        /// Number of captions submitted
        caption_count: usize,
        /// Number of batches they were split into
        batch_count: usize,
    },

    /// One more batch settled successfully
    BatchCompleted {
        /// Batches settled so far
        completed: usize,
        /// Total number of batches
        total: usize,
    },

    /// Every batch settled; emitted before captions are reassembled
    Finished {
        /// Wall time spent on backend work
        duration: Duration,
    },

    /// A caption could not be matched to a translation and keeps its original text
    Error {
        /// Identifier of the affected caption
        id: String,
        /// Human readable description
        message: String,
    },
}

/// Receiver of translation progress signals
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &TranslationEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&TranslationEvent) + Send + Sync,
{
    fn on_event(&self, event: &TranslationEvent) {
        self(event)
    }
}

// A closed receiver just means nobody is listening anymore.
impl ProgressObserver for UnboundedSender<TranslationEvent> {
    fn on_event(&self, event: &TranslationEvent) {
        let _ = self.send(event.clone());
    }
}

/// Observer that discards every signal
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_event(&self, _event: &TranslationEvent) {}
}
