//! Key-value adapters backing the offline store
//!
//! `MemoryKvStore` keeps the backlog for the lifetime of the process;
//! `FileKvStore` persists it across restarts with one file per key and
//! atomic replacement on write.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use courier_core::KeyValueStore;
use courier_domain::{NetError, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Process-local [`KeyValueStore`] with no persistence.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Durable [`KeyValueStore`] over a directory of flat files.
///
/// Keys map to file names through character sanitization, so distinct keys
/// that sanitize identically share a file; stick to dotted identifiers like
/// `courier.offline.requests`. Writes go through a temp file, are flushed
/// to disk, and then renamed over the previous value.
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Open a store rooted at the given directory, creating it if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|err| storage_error("create storage directory", &root, err))?;
        debug!(root = %root.display(), "file kv store opened");
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.bin"))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_error("read", &path, err)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .map_err(|err| storage_error("open", &temp_path, err))?;
        file.write_all(&value).await.map_err(|err| storage_error("write", &temp_path, err))?;
        file.sync_all().await.map_err(|err| storage_error("flush", &temp_path, err))?;
        drop(file);

        // Atomic rename
        fs::rename(&temp_path, &path).await.map_err(|err| storage_error("commit", &path, err))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error("remove", &path, err)),
        }
    }
}

fn storage_error(operation: &str, path: &Path, err: std::io::Error) -> NetError {
    NetError::storage(format!("{} {} failed: {}", operation, path.display(), err))
}
