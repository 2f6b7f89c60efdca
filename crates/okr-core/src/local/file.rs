//! File-backed blob store.
//!
//! Each key is stored as `{dir}/{key}.json`. Writes go to a temp file and are
//! renamed into place so a reader never sees a half-written blob. A sidecar
//! `{key}.lock` file carries advisory locks (via `fs2`): shared for reads,
//! exclusive for writes.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::{validate_key, BlobStore};

/// Blob store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `dir`.
    ///
    /// Does not create the directory; use [`FileBlobStore::open_or_create`] for that.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open a store, creating the directory if it doesn't exist.
    pub fn open_or_create(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        }
        Ok(Self::new(dir))
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the blob file for `key`.
    #[must_use]
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    fn open_lock(&self, key: &str) -> Result<File> {
        let path = self.lock_path(key);
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        if !self.dir.exists() {
            return Ok(None);
        }

        let lock = self.open_lock(key)?;
        lock.lock_shared()
            .context("Failed to acquire shared lock")?;

        let path = self.blob_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read blob: {}", path.display()))
            }
        }
        // Lock is released when `lock` is dropped
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("Failed to create data directory: {}", self.dir.display())
            })?;
        }

        let lock = self.open_lock(key)?;
        lock.lock_exclusive()
            .context("Failed to acquire exclusive lock")?;

        let path = self.blob_path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("Failed to create temp blob: {}", tmp.display()))?;
            file.write_all(value.as_bytes())
                .context("Failed to write blob")?;
            file.sync_all().context("Failed to flush blob")?;
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move blob into place: {}", path.display()))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        if !self.dir.exists() {
            return Ok(());
        }

        let lock = self.open_lock(key)?;
        lock.lock_exclusive()
            .context("Failed to acquire exclusive lock")?;

        let path = self.blob_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove blob: {}", path.display()))
            }
        }
    }
}
