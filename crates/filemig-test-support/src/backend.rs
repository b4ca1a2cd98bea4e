//! Storage backend whose failures and latencies are scripted per path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use filemig_storage::{MemoryBackend, StorageBackend, StorageError, StorageResult};

const KIND: &str = "scripted";

/// Failure a scripted path produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Report the object as absent.
    Missing,
    /// Answer like a service rejecting the request with `503`.
    Unavailable,
    /// Accept the write, then report a digest that does not match.
    IntegrityMismatch,
}

/// Backend call observed by a [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `fetch(path)` was invoked.
    Fetch(String),
    /// `store(path, ..)` was invoked.
    Store(String),
}

#[derive(Debug, Default)]
struct Script {
    fetch_failures: HashMap<String, ScriptedFailure>,
    store_failures: HashMap<String, ScriptedFailure>,
    delays: HashMap<String, Duration>,
    calls: Vec<BackendCall>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: MemoryBackend,
    script: Mutex<Script>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// In-memory backend with per-path failures, delays and a call log.
///
/// Clones share objects, script and counters.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    inner: Arc<Inner>,
}

impl ScriptedBackend {
    /// Empty backend that succeeds on every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    #[must_use]
    pub fn with_object(self, path: &str, payload: &[u8]) -> Self {
        self.inner.objects.insert(path, payload);
        self
    }

    /// Make `fetch(path)` fail.
    #[must_use]
    pub fn failing_fetch(self, path: &str, failure: ScriptedFailure) -> Self {
        self.script()
            .fetch_failures
            .insert(path.to_string(), failure);
        self
    }

    /// Make `store(path, ..)` fail.
    #[must_use]
    pub fn failing_store(self, path: &str, failure: ScriptedFailure) -> Self {
        self.script()
            .store_failures
            .insert(path.to_string(), failure);
        self
    }

    /// Delay every call for `path` by `delay`.
    #[must_use]
    pub fn delayed(self, path: &str, delay: Duration) -> Self {
        self.script().delays.insert(path.to_string(), delay);
        self
    }

    /// Every call made so far, in invocation order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.script().calls.clone()
    }

    /// Number of `store` calls made so far.
    #[must_use]
    pub fn store_calls(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Store(_)))
            .count()
    }

    /// Payload currently stored at `path`.
    #[must_use]
    pub fn stored(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.objects.get(path)
    }

    /// Highest number of calls that were running at the same time.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, call: BackendCall, path: &str) -> Option<Duration> {
        let mut script = self.script();
        script.calls.push(call);
        let delay = script.delays.get(path).copied();
        drop(script);

        let running = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .peak_in_flight
            .fetch_max(running, Ordering::SeqCst);
        delay
    }

    fn end(&self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn failure_error(failure: ScriptedFailure, path: &str) -> StorageError {
    match failure {
        ScriptedFailure::Missing => StorageError::NotFound {
            backend: KIND,
            path: path.to_string(),
        },
        ScriptedFailure::Unavailable => StorageError::Status {
            operation: "scripted",
            key: path.to_string(),
            status: 503,
            body: None,
        },
        ScriptedFailure::IntegrityMismatch => StorageError::IntegrityMismatch {
            path: path.to_string(),
            expected: "\"expected\"".to_string(),
            actual: Some("\"actual\"".to_string()),
        },
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        let delay = self.begin(BackendCall::Fetch(path.to_string()), path);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.script().fetch_failures.get(path).copied();
        let result = match failure {
            Some(failure) => Err(failure_error(failure, path)),
            None => self.inner.objects.fetch(path).await,
        };
        self.end();
        result
    }

    async fn store(&self, path: &str, payload: &[u8]) -> StorageResult<()> {
        let delay = self.begin(BackendCall::Store(path.to_string()), path);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.script().store_failures.get(path).copied();
        let result = match failure {
            Some(ScriptedFailure::IntegrityMismatch) => {
                match self.inner.objects.store(path, payload).await {
                    Ok(()) => Err(failure_error(ScriptedFailure::IntegrityMismatch, path)),
                    Err(err) => Err(err),
                }
            }
            Some(failure) => Err(failure_error(failure, path)),
            None => self.inner.objects.store(path, payload).await,
        };
        self.end();
        result
    }
}
