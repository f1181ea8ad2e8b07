// Durable key-value blob storage

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// String-keyed store holding one serialized value per key
///
/// Reading a key that was never written yields `None`, not an error.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn put(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<B: BlobStore + ?Sized> BlobStore for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Longest accepted blob key
pub const MAX_KEY_LEN: usize = 64;

/// Keys double as file names and table keys, so keep them boring
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Blob key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(eyre!("Blob key too long: {} (max {} chars)", key, MAX_KEY_LEN));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid blob key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local blob store, lost when dropped
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }
}

// ============================================================================
// Files
// ============================================================================

/// One `{key}.json` file per key inside a directory
///
/// Writes go to a temp file which is fsynced and renamed over the target while
/// an exclusive lock is held on `{key}.lock`, so a reader never observes a
/// half-written blob and two processes never interleave writes.
#[derive(Debug)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open or create a blob directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create blob directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", key))
    }

    fn lock_file(&self, key: &str) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(key))
            .context("Failed to open blob lock file")
    }

    /// Read-only handle on an existing lock file
    ///
    /// `None` if no writer ever created one, so reading never needs write
    /// access to the directory.
    fn existing_lock_file(&self, key: &str) -> Result<Option<File>> {
        match File::open(self.lock_path(key)) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to open blob lock file"),
        }
    }

    fn write_replacing(tmp_path: &Path, path: &Path, value: &str) -> Result<()> {
        {
            let mut tmp = File::create(tmp_path).context("Failed to create temp blob file")?;
            tmp.write_all(value.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(tmp_path, path).with_context(|| format!("Failed to replace blob {:?}", path))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.blob_path(key);

        let lock = self.existing_lock_file(key)?;
        if let Some(lock) = &lock {
            FileExt::lock_shared(lock).context("Failed to acquire shared blob lock")?;
        }

        match fs::read_to_string(&path) {
            Ok(raw) => {
                debug!(file = ?path, bytes = raw.len(), "Read blob");
                Ok(Some(raw))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read blob {:?}", path)),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.blob_path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));

        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire blob lock")?;

        if let Err(e) = Self::write_replacing(&tmp_path, &path, value) {
            match fs::remove_file(&tmp_path) {
                Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                    debug!(file = ?tmp_path, error = %cleanup, "Failed to remove temp blob file");
                }
                _ => {}
            }
            return Err(e);
        }

        debug!(file = ?path, bytes = value.len(), "Wrote blob");
        // Lock is released when `lock` is dropped
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.blob_path(key);

        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire blob lock")?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove blob {:?}", path)),
        }
    }
}
