//! Report storage: where uploaded PDFs live until they are analysed.
//!
//! The analyzer only needs to fetch bytes by path; the HTTP layer also needs
//! to store uploads and create the bucket. Both go through the [`Storage`]
//! trait so tests can count calls or fail on demand.
//!
//! [`LocalStorage`] keeps the bucket as a directory on disk. Object paths are
//! relative, `/`-separated and may not climb out of the bucket.

use crate::error::StorageError;
use futures::future::{BoxFuture, FutureExt};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Default bucket directory.
pub const DEFAULT_STORAGE_DIR: &str = "./storage/market-reports";

/// Largest accepted upload: 10 MiB.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Object storage for report PDFs.
pub trait Storage: Send + Sync {
    /// Fetch the bytes stored at `path`.
    fn download<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>>;

    /// Store `bytes` at `path`, replacing any previous object. Returns the path.
    fn upload<'a>(
        &'a self,
        path: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String, StorageError>>;

    /// Create the bucket if needed. `true` when it was created by this call.
    fn ensure_bucket(&self) -> BoxFuture<'_, Result<bool, StorageError>>;

    /// Whether the bucket currently exists.
    fn bucket_exists(&self) -> BoxFuture<'_, bool>;
}

/// Storage path for a new upload: `reports/{unix_millis}_{name}` with
/// whitespace runs in the name replaced by `_`.
pub fn upload_path(file_name: &str, unix_millis: u128) -> String {
    let name = file_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("reports/{unix_millis}_{name}")
}

/// A bucket backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Override the upload size limit.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path to a file inside the bucket.
    ///
    /// Rejects empty and absolute paths, and any `..` or prefix component.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let invalid = |reason: &str| StorageError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }
        let rel = Path::new(trimmed);
        if rel.is_absolute() || trimmed.starts_with('/') || trimmed.starts_with('\\') {
            return Err(invalid("absolute paths are not allowed"));
        }

        let mut resolved = self.root.clone();
        for component in rel.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("'..' is not allowed")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("absolute paths are not allowed"))
                }
            }
        }
        if resolved == self.root {
            return Err(invalid("path names the bucket itself"));
        }
        Ok(resolved)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                debug!("Downloaded {} ({} bytes)", path, bytes.len());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(StorageError::Io {
                path: file,
                source: e,
            }),
        }
    }

    async fn write(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        // Write to a sibling temp file, then rename, so readers never see a
        // partial object.
        let tmp = file.with_extension("part");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StorageError::Io {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &file)
            .await
            .map_err(|e| StorageError::Io {
                path: file.clone(),
                source: e,
            })?;

        info!("Stored {} ({} bytes, {})", path, bytes.len(), content_type);
        Ok(path.to_string())
    }

    async fn create_bucket(&self) -> Result<bool, StorageError> {
        if tokio::fs::metadata(&self.root).await.is_ok_and(|m| m.is_dir()) {
            return Ok(false);
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Io {
                path: self.root.clone(),
                source: e,
            })?;
        info!("Created storage bucket at {}", self.root.display());
        Ok(true)
    }
}

impl Storage for LocalStorage {
    fn download<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        self.read(path).boxed()
    }

    fn upload<'a>(
        &'a self,
        path: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String, StorageError>> {
        self.write(path, bytes, content_type).boxed()
    }

    fn ensure_bucket(&self) -> BoxFuture<'_, Result<bool, StorageError>> {
        self.create_bucket().boxed()
    }

    fn bucket_exists(&self) -> BoxFuture<'_, bool> {
        async move {
            tokio::fs::metadata(&self.root)
                .await
                .is_ok_and(|m| m.is_dir())
        }
        .boxed()
    }
}
