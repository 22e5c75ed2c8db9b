//! File-backed blob store
//!
//! One directory per namespace, one file per key. Writes go through a
//! temporary file, fsync, and an atomic rename so a blob is always either the
//! old bytes or the new bytes, never a torn mix; `commit` fsyncs the
//! namespace directory so renames and removals survive power loss.
//!
//! Cross-*blob* atomicity is still out of scope: that is the table layer's
//! documented weak guarantee, not something this store can provide.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{check_key, BlobError, BlobResult, BlobStore};

/// File-per-key [`BlobStore`] rooted at `<root>/<namespace>/`.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (creating if needed) the namespace directory under `root`.
    pub fn open(root: &Path, namespace: &str) -> BlobResult<Self> {
        let dir = root.join(namespace);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the namespace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, key: &str) -> BlobResult<PathBuf> {
        check_key(key)?;
        // Keys double as file names; anything that could escape the
        // namespace directory is rejected outright.
        if key.is_empty()
            || !key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(BlobError::Backend(format!("invalid key: {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        let path = self.blob_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> BlobResult<()> {
        let path = self.blob_path(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            f.write_all(value)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn erase(&self, key: &str) -> BlobResult<()> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    fn erase_all(&self) -> BlobResult<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn commit(&self) -> BlobResult<()> {
        // Renames and removals are only durable once the directory itself is
        // synced.
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    fn recover(&self) -> BlobResult<()> {
        // Reopen-equivalent: confirm the namespace directory is still there
        // and sweep any temp files left by an interrupted write.
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && name.ends_with(".tmp") {
                let _ = fs::remove_file(entry.path());
            }
        }
        Ok(())
    }
}
