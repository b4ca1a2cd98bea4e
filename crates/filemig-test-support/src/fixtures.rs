//! Notifier, path policy and item source doubles.

use std::collections::HashSet;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use filemig_core::{BoxError, CompletionNotifier, ItemReport, ItemSource, PathPolicy};

/// Notifier that keeps every report it receives, in arrival order.
#[derive(Debug)]
pub struct RecordingNotifier<I> {
    reports: Arc<Mutex<Vec<ItemReport<I>>>>,
}

impl<I> Clone for RecordingNotifier<I> {
    fn clone(&self) -> Self {
        Self {
            reports: Arc::clone(&self.reports),
        }
    }
}

impl<I> Default for RecordingNotifier<I> {
    fn default() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<I: Clone> RecordingNotifier<I> {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every report received so far.
    #[must_use]
    pub fn reports(&self) -> Vec<ItemReport<I>> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reports received.
    #[must_use]
    pub fn count(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Reports carrying an error.
    #[must_use]
    pub fn failures(&self) -> Vec<ItemReport<I>> {
        self.reports()
            .into_iter()
            .filter(|report| report.error.is_some())
            .collect()
    }
}

impl<I> CompletionNotifier<I> for RecordingNotifier<I>
where
    I: Clone + Send,
{
    fn notify(&self, report: &ItemReport<I>) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }
}

#[derive(Debug, Default)]
struct PolicyCounters {
    source_calls: AtomicUsize,
    destination_calls: AtomicUsize,
}

/// Prefixing path policy that counts how often each side is resolved.
///
/// The source path is `{source_prefix}{item}`, the destination path
/// `{destination_prefix}{item}`. Items can be marked unresolvable per side.
#[derive(Debug, Clone)]
pub struct CountingPolicy {
    source_prefix: String,
    destination_prefix: String,
    unresolvable_sources: HashSet<String>,
    unresolvable_destinations: HashSet<String>,
    counters: Arc<PolicyCounters>,
}

impl CountingPolicy {
    /// Policy with the given prefixes.
    #[must_use]
    pub fn new(source_prefix: &str, destination_prefix: &str) -> Self {
        Self {
            source_prefix: source_prefix.to_string(),
            destination_prefix: destination_prefix.to_string(),
            unresolvable_sources: HashSet::new(),
            unresolvable_destinations: HashSet::new(),
            counters: Arc::new(PolicyCounters::default()),
        }
    }

    /// Fail source path resolution for `item`.
    #[must_use]
    pub fn without_source(mut self, item: &str) -> Self {
        self.unresolvable_sources.insert(item.to_string());
        self
    }

    /// Fail destination path resolution for `item`.
    #[must_use]
    pub fn without_destination(mut self, item: &str) -> Self {
        self.unresolvable_destinations.insert(item.to_string());
        self
    }

    /// Number of `source_path` calls.
    #[must_use]
    pub fn source_calls(&self) -> usize {
        self.counters.source_calls.load(Ordering::SeqCst)
    }

    /// Number of `destination_path` calls.
    #[must_use]
    pub fn destination_calls(&self) -> usize {
        self.counters.destination_calls.load(Ordering::SeqCst)
    }
}

impl<I: Display> PathPolicy<I> for CountingPolicy {
    fn source_path(&self, item: &I) -> Result<String, BoxError> {
        self.counters.source_calls.fetch_add(1, Ordering::SeqCst);
        let key = item.to_string();
        if self.unresolvable_sources.contains(&key) {
            return Err(format!("no source path for {key}").into());
        }
        Ok(format!("{}{key}", self.source_prefix))
    }

    fn destination_path(&self, item: &I) -> Result<String, BoxError> {
        self.counters
            .destination_calls
            .fetch_add(1, Ordering::SeqCst);
        let key = item.to_string();
        if self.unresolvable_destinations.contains(&key) {
            return Err(format!("no destination path for {key}").into());
        }
        Ok(format!("{}{key}", self.destination_prefix))
    }
}

/// Item source whose listing always fails.
#[derive(Debug)]
pub struct FailingItems<I> {
    calls: Arc<AtomicUsize>,
    _items: PhantomData<fn() -> I>,
}

impl<I> Clone for FailingItems<I> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            _items: PhantomData,
        }
    }
}

impl<I> Default for FailingItems<I> {
    fn default() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            _items: PhantomData,
        }
    }
}

impl<I> FailingItems<I> {
    /// New failing source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `list_items` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I: Send> ItemSource<I> for FailingItems<I> {
    async fn list_items(&self) -> Result<Vec<I>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("item listing unavailable".into())
    }
}
