/*!
 * Tests for error types
 */

use std::error::Error;
use subtrans::{ProviderError, SubtitleError, TranslationError};

/// Batch failures keep the backend error as their source
#[test]
fn test_batch_failed_shouldExposeSource() {
    let error = TranslationError::BatchFailed {
        batch: 2,
        source: ProviderError::RateLimitExceeded("slow down".to_string()),
    };

    assert_eq!(error.to_string(), "Batch 2 failed: Rate limit exceeded: slow down");
    let source = error.source().unwrap();
    assert_eq!(source.to_string(), "Rate limit exceeded: slow down");
}

/// Subtitle errors name the offending input
#[test]
fn test_no_captions_shouldNameInput() {
    let error: anyhow::Error = SubtitleError::NoCaptions("movie.srt".to_string()).into();
    assert_eq!(error.to_string(), "No captions found in movie.srt");
    assert!(matches!(error.downcast_ref::<SubtitleError>(), Some(SubtitleError::NoCaptions(_))));
}
