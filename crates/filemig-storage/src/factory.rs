//! Backend construction from configuration.

use std::sync::Arc;

use filemig_config::BackendConfig;
use tracing::debug;

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use crate::filesystem::FilesystemBackend;
use crate::memory::MemoryBackend;
use crate::object_storage::ObjectStorageBackend;

/// Build the backend named by `config.kind`.
///
/// # Errors
///
/// Returns an error when the selected backend rejects its settings.
pub fn build_backend(config: &BackendConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config {
        BackendConfig::Filesystem(settings) => {
            Arc::new(FilesystemBackend::new(settings.absolute_path.clone())?)
        }
        BackendConfig::ObjectStorage(settings) => Arc::new(ObjectStorageBackend::new(settings)?),
        BackendConfig::Memory => Arc::new(MemoryBackend::new()),
    };
    debug!(kind = backend.kind(), "storage backend ready");
    Ok(backend)
}
