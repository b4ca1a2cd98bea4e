//! Process-local backend kept in a shared map.
//!
//! Useful for dry runs (the destination is discarded when the process ends)
//! and as a source seeded by tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

const KIND: &str = "memory";

/// In-memory backend. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with `objects`.
    #[must_use]
    pub fn with_objects<I, K, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let map = objects
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            objects: Arc::new(Mutex::new(map)),
        }
    }

    /// Put `payload` at `path`, replacing any previous value.
    pub fn insert(&self, path: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.lock().insert(path.into(), payload.into());
    }

    /// Copy of the payload stored at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().get(path).cloned()
    }

    /// Sorted list of stored paths.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.get(path).ok_or_else(|| StorageError::NotFound {
            backend: KIND,
            path: path.to_string(),
        })
    }

    async fn store(&self, path: &str, payload: &[u8]) -> StorageResult<()> {
        if path.is_empty() {
            return Err(StorageError::invalid_path(path, "empty"));
        }
        self.lock().insert(path.to_string(), payload.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_objects_are_fetchable() -> StorageResult<()> {
        let backend = MemoryBackend::with_objects([("a.txt", b"alpha".to_vec())]);
        assert_eq!(backend.fetch("a.txt").await?, b"alpha");
        assert!(backend.fetch("b.txt").await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn clones_share_contents() -> StorageResult<()> {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        clone.insert("x", b"0".to_vec());
        clone.store("x", b"1").await?;
        clone.store("x", b"2").await?;
        assert_eq!(backend.get("x"), Some(b"2".to_vec()));
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.paths(), vec!["x".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.store("", b"data").await,
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(backend.is_empty());
    }
}
