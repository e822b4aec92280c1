//! Session locking and atomic writes for the file-backed store
//!
//! A `todos` command holds one exclusive lock on `<data dir>/.lock` from
//! load until its last write, so concurrent processes apply their
//! load/mutate/persist cycles one after another. Every key file is
//! replaced through [`write_atomic`], so a reader never sees a partial
//! snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// How long a command waits for the session lock by default
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on a file, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Wait up to `timeout_ms` for the lock, creating the file if needed.
    ///
    /// Fails with [`Error::LockFailed`] when another holder keeps it past
    /// the deadline.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;
        let started = Instant::now();
        let deadline = started + Duration::from_millis(timeout_ms);

        while !try_lock(&file)? {
            if Instant::now() >= deadline {
                tracing::warn!(path = %path.display(), timeout_ms, "timed out waiting for lock");
                return Err(Error::LockFailed(path.to_path_buf()));
            }
            thread::sleep(POLL_INTERVAL);
        }

        tracing::debug!(
            path = %path.display(),
            waited_ms = started.elapsed().as_millis() as u64,
            "lock acquired"
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock only if it is free right now
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;
        if !try_lock(&file)? {
            return Ok(None);
        }
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::debug!(path = %self.path.display(), error = %err, "unlock failed");
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

/// `Ok(false)` when someone else holds the lock
fn try_lock(file: &File) -> Result<bool> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(true),
        Err(err) if is_contended(&err) => Ok(false),
        Err(err) => Err(Error::Io(err)),
    }
}

fn is_contended(err: &io::Error) -> bool {
    // Windows reports sharing/lock violations (32, 33) instead of WouldBlock
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)))
}

/// Replace `path` with `data` via a synced sibling temp file and a rename
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{name}.{}.tmp", std::process::id()));

    let mut temp = File::create(&temp_path)?;
    temp.write_all(data)?;
    temp.sync_all()?;
    drop(temp);

    fs::rename(&temp_path, path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        Error::Io(err)
    })
}
