//! Advisory destination lock (§5): guards against two concurrent runs
//! writing into the same destination directory. Grounded on the teacher's
//! `test-utils` use of a lock file to serialize access to a shared cache
//! directory (`fslock::LockFile`); this crate uses `fs4`'s `FileExt` instead
//! since it's already pulled in for the workspace's other file-level needs.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{Error, Result};

/// Held for the duration of a run; the lock is released when this value is
/// dropped (process exit included).
pub struct DestinationLock {
    file: File,
    path: PathBuf,
}

impl DestinationLock {
    /// Acquires the advisory lock at `path`, creating the destination
    /// directory and the lock file itself if needed. Fails with
    /// `Error::DestinationLocked` if another run already holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        file.try_lock_exclusive()
            .map_err(|_| Error::DestinationLocked(path.to_path_buf()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DestinationLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pypisync.lock");
        let first = DestinationLock::acquire(&path).unwrap();
        let err = DestinationLock::acquire(&path).unwrap_err();
        assert!(matches!(err, Error::DestinationLocked(_)));
        drop(first);
        assert!(DestinationLock::acquire(&path).is_ok());
    }
}
