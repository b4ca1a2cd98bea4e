//! Local filesystem backend.
//!
//! Paths handed to the backend are relative and joined onto the configured
//! absolute root. Each write goes to its own uniquely named sibling file and
//! is renamed into place, so readers never observe a half-written payload and
//! concurrent stores to one path never share a temporary file.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

const KIND: &str = "filesystem";
const PARTIAL_SUFFIX: &str = ".filemig-partial";

/// Backend reading and writing files below an absolute root directory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a backend rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if `root` is not absolute.
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(StorageError::InvalidConfig {
                field: "absolute_path",
                reason: "must be absolute",
                value: Some(root.display().to_string()),
            });
        }
        Ok(Self { root })
    }

    /// Root directory all paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative item path onto the root, refusing anything that could
    /// resolve outside of it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for empty, absolute or
    /// parent-traversing paths.
    pub fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let mut relative = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(segment) => relative.push(segment),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StorageError::invalid_path(path, "parent traversal"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::invalid_path(path, "absolute path"));
                }
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(StorageError::invalid_path(path, "empty"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.resolve(path)?;
        match fs::read(&full).await {
            Ok(payload) => {
                debug!(path = %full.display(), bytes = payload.len(), "read file");
                Ok(payload)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound {
                backend: KIND,
                path: path.to_string(),
            }),
            Err(err) => Err(StorageError::io("filesystem.read", full, err)),
        }
    }

    async fn store(&self, path: &str, payload: &[u8]) -> StorageResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io("filesystem.create_dir", parent, err))?;
        }

        let partial = partial_path(&full);
        if let Err(err) = fs::write(&partial, payload).await {
            let _ = fs::remove_file(&partial).await;
            return Err(StorageError::io("filesystem.write", partial, err));
        }
        if let Err(err) = fs::rename(&partial, &full).await {
            let _ = fs::remove_file(&partial).await;
            return Err(StorageError::io("filesystem.rename", full, err));
        }
        debug!(path = %full.display(), bytes = payload.len(), "wrote file");
        Ok(())
    }
}

fn partial_path(full: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    if let Some(file_name) = full.file_name() {
        name.push(file_name);
    }
    name.push(format!(".{}{PARTIAL_SUFFIX}", Uuid::new_v4().simple()));
    full.with_file_name(name)
}
