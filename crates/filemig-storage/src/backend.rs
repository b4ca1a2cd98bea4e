//! The storage capability shared by every backend.

use std::fmt;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Two-operation capability a migration needs from a storage system.
///
/// Implementations hold only configuration fixed at construction time and
/// must tolerate concurrent calls for different paths. A new backend kind is
/// added by implementing `fetch` and `store`; anything beyond that (checksum
/// validation, directory creation) stays inside the implementation.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Stable identifier of the backend kind, used in logs.
    fn kind(&self) -> &'static str;

    /// Read the complete payload stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] when nothing is stored at
    /// `path`, or another variant when the backend cannot be read. A partial
    /// payload is never returned.
    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Write `payload` to `path`, replacing anything already stored there.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails or, for verifying backends, when
    /// the digest reported after the write does not match the payload.
    async fn store(&self, path: &str, payload: &[u8]) -> StorageResult<()>;
}
