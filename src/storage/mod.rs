//! Blob storage for uploaded posters.
//!
//! Blobs are addressed by a generated key (`<uuid><.ext>`). Keys handed back by
//! clients are reduced to their base name before touching the file system.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Longest file extension carried over from an uploaded file name
const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found")]
    NotFound,
    #[error("invalid blob key")]
    InvalidKey,
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store and retrieve binary blobs by generated name
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `data`, returning the generated key it can be fetched by
    async fn put(&self, original_name: &str, data: Bytes) -> Result<String, StorageError>;

    /// Fetch a blob by key
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;
}

/// Blob store backed by a flat directory on the local file system
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, original_name: &str, data: Bytes) -> Result<String, StorageError> {
        let key = generate_key(original_name);
        let path = self.root.join(&key);
        tokio::fs::write(&path, &data).await?;
        debug!(key = %key, size = data.len(), "Stored blob");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let name = sanitize_key(key).ok_or(StorageError::InvalidKey)?;
        match tokio::fs::read(self.root.join(name)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Generate a fresh key, keeping a short alphanumeric extension of the
/// original file name if it has one
pub fn generate_key(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}{}", uuid::Uuid::new_v4(), extension)
}

/// Reduce a client-supplied key to its base name.
///
/// Returns `None` for keys with no usable file name (`""`, `.`, `..`, `a/..`).
pub fn sanitize_key(key: &str) -> Option<&str> {
    // Treat both separators alike regardless of platform.
    let base = key.rsplit(['/', '\\']).next()?;
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base)
}
