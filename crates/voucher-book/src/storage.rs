//! File storage for generated PDFs

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use crate::constants::PDF_MIME_TYPE;
use crate::error::StorageError;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub size: usize,
    pub mimetype: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `prefix` and return where they can be fetched.
    async fn save_file(&self, bytes: Vec<u8>, prefix: &str) -> StorageResult<StoredFile>;

    /// Delete a file previously returned by `save_file`.
    async fn delete_file(&self, url: &str) -> StorageResult<()>;
}

/// Reject prefixes that could escape the storage root
fn check_prefix(prefix: &str) -> StorageResult<()> {
    let safe = !prefix.is_empty()
        && Path::new(prefix)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(StorageError::Upload(format!("Invalid storage prefix '{prefix}'")))
    }
}

// =============================================================================
// Local Filesystem
// =============================================================================

/// Stores files under a directory. URLs are `{base_url}/{prefix}/{uuid}.pdf`.
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub async fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Filesystem path behind a URL this storage handed out
    pub fn path_for(&self, url: &str) -> StorageResult<PathBuf> {
        let relative = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
        check_prefix(relative).map_err(|_| StorageError::InvalidUrl(url.to_string()))?;
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save_file(&self, bytes: Vec<u8>, prefix: &str) -> StorageResult<StoredFile> {
        check_prefix(prefix)?;
        let dir = self.root.join(prefix);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.pdf", Uuid::new_v4());
        let size = bytes.len();
        tokio::fs::write(dir.join(&name), bytes).await?;

        let url = format!("{}/{}/{}", self.base_url, prefix, name);
        debug!("Stored {size} bytes at {url}");
        Ok(StoredFile {
            url,
            size,
            mimetype: PDF_MIME_TYPE.to_string(),
        })
    }

    async fn delete_file(&self, url: &str) -> StorageResult<()> {
        let path = self.path_for(url)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}

// =============================================================================
// In Memory
// =============================================================================

/// Keeps files in a map. Uploads can be made to fail for tests.
#[derive(Default)]
pub struct MemoryFileStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn files(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| StorageError::Upload("storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn save_file(&self, bytes: Vec<u8>, prefix: &str) -> StorageResult<StoredFile> {
        check_prefix(prefix)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload("storage unavailable".to_string()));
        }

        let url = format!("memory://{}/{}.pdf", prefix, Uuid::new_v4());
        let size = bytes.len();
        self.files()?.insert(url.clone(), bytes);
        Ok(StoredFile {
            url,
            size,
            mimetype: PDF_MIME_TYPE.to_string(),
        })
    }

    async fn delete_file(&self, url: &str) -> StorageResult<()> {
        match self.files()?.remove(url) {
            Some(_) => Ok(()),
            None => Err(StorageError::InvalidUrl(url.to_string())),
        }
    }
}
