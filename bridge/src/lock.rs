use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::BridgeError;

/// File name of the invocation lock inside the git metadata directory.
pub const LOCK_FILE: &str = "gitcc.lock";

/// Exclusive advisory lock preventing two bridge invocations from working
/// against the same repository pair. Released when dropped.
#[derive(Debug)]
pub struct BridgeLock {
    file: File,
    path: PathBuf,
}

impl BridgeLock {
    pub fn acquire(metadata_dir: &Path) -> Result<Self, BridgeError> {
        let path = metadata_dir.join(LOCK_FILE);
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| BridgeError::Locked(path.clone()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BridgeLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
