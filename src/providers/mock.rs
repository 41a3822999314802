/*!
 * Mock backend implementations for testing.
 *
 * This module provides an in-process backend that simulates the behaviors the
 * batch scheduler has to cope with:
 * - `MockBackend::working()` - Translates every unit
 * - `MockBackend::omitting(ids, times)` - Drops some ids for a number of calls
 * - `MockBackend::never_returning(ids)` - Never translates some ids
 * - `MockBackend::failing(kind)` - Always fails with an error
 *
 * Every call is recorded, together with the number of calls in flight, so
 * tests can check retry payloads and the concurrency bound.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::subtitle_processor::TranslationUnit;
use super::TranslationBackend;

/// Type of error to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFailure {
    /// Authentication error (invalid API key)
    #[default]
    Auth,
    /// Connection error
    Connection,
    /// Rate limit error
    RateLimit,
    /// API error
    Api,
}

impl MockFailure {
    fn to_error(self) -> ProviderError {
        match self {
            Self::Auth => ProviderError::AuthenticationError("Invalid API key".into()),
            Self::Connection => ProviderError::ConnectionError("Connection failed".into()),
            Self::RateLimit => ProviderError::RateLimitExceeded("Rate limit exceeded".into()),
            Self::Api => ProviderError::ApiError {
                status_code: 500,
                message: "Internal server error".into(),
            },
        }
    }
}

/// Behavior mode for the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Translates every unit
    Working,
    /// Leaves out each listed id the first `times` times it is requested
    Omitting { ids: Vec<String>, times: usize },
    /// Never translates the listed ids
    NeverReturning { ids: Vec<String> },
    /// Always fails
    Failing(MockFailure),
    /// Fails on the given 1-based call number, works otherwise
    FailOnCall { call: usize, failure: MockFailure },
}

/// Counters shared between clones of a mock backend
#[derive(Debug, Default)]
pub struct MockStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<Vec<String>>>,
}

impl MockStats {
    /// Number of backend calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Ids sent with every call, in call order
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

// Keeps the in-flight counter right even when a call is cancelled mid-way.
struct InFlightGuard<'a>(&'a MockStats);

impl<'a> InFlightGuard<'a> {
    fn enter(stats: &'a MockStats) -> Self {
        let current = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock backend for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Behavior mode
    behavior: MockBehavior,
    /// Simulated latency of every call
    delay: Option<Duration>,
    /// Shared call statistics
    stats: Arc<MockStats>,
    /// How many times each id has been left out so far
    omitted: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            stats: Arc::new(MockStats::default()),
            omitted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a working mock backend
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a backend that drops `ids` for their first `times` requests
    pub fn omitting(ids: &[&str], times: usize) -> Self {
        Self::new(MockBehavior::Omitting {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            times,
        })
    }

    /// Create a backend that never translates `ids`
    pub fn never_returning(ids: &[&str]) -> Self {
        Self::new(MockBehavior::NeverReturning {
            ids: ids.iter().map(|id| id.to_string()).collect(),
        })
    }

    /// Create a failing mock backend
    pub fn failing(failure: MockFailure) -> Self {
        Self::new(MockBehavior::Failing(failure))
    }

    /// Add simulated latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared statistics handle
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// Text the mock produces for a unit
    pub fn translated_text(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    fn should_omit(&self, id: &str) -> bool {
        match &self.behavior {
            MockBehavior::NeverReturning { ids } => ids.iter().any(|i| i == id),
            MockBehavior::Omitting { ids, times } => {
                if !ids.iter().any(|i| i == id) {
                    return false;
                }
                let Ok(mut omitted) = self.omitted.lock() else {
                    return false;
                };
                let count = omitted.entry(id.to_string()).or_insert(0);
                if *count < *times {
                    *count += 1;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(
        &self,
        units: &[TranslationUnit],
        _source_language: &str,
        target_language: &str,
    ) -> Result<Vec<TranslationUnit>, ProviderError> {
        let call = self.stats.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.stats.requests.lock() {
            requests.push(units.iter().map(|unit| unit.id.clone()).collect());
        }

        let _guard = InFlightGuard::enter(&self.stats);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior {
            MockBehavior::Failing(failure) => return Err(failure.to_error()),
            MockBehavior::FailOnCall { call: failing_call, failure } if failing_call == call => {
                return Err(failure.to_error());
            }
            _ => {}
        }

        Ok(units
            .iter()
            .filter(|unit| !self.should_omit(&unit.id))
            .map(|unit| TranslationUnit::new(unit.id.clone(), Self::translated_text(&unit.text, target_language)))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
