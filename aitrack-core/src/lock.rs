//! Per-directory locking for metadata-store mutation.
//!
//! Uses advisory file locks (`flock(2)` on Unix) via the `fs2` crate.
//! At most one writer may extend a directory's branch references at a
//! time; the OS releases the lock if the process crashes, so no stale
//! lock detection is needed.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

const LOCK_FILE: &str = "aitrack.lock";

/// An exclusive lock on one working directory's metadata store.
///
/// Held for the lifetime of the value; dropped, the lock is released.
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Acquire the lock, polling until it is free or `timeout` expires.
    pub fn acquire(git_dir: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(git_dir.join(LOCK_FILE))?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(DirLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => return Err(Error::LockTimeout),
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        {
            let _lock = DirLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();
            assert!(dir.path().join(LOCK_FILE).exists());
        }
        // Released on drop; reacquiring succeeds immediately.
        let _lock = DirLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn test_second_acquire_times_out() {
        let dir = tempdir().unwrap();
        let _held = DirLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();

        let result = DirLock::acquire(dir.path(), Duration::from_millis(50));
        assert!(matches!(result, Err(Error::LockTimeout)));
    }
}
