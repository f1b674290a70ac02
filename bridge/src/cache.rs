use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the pending-commit cache inside the git metadata directory.
pub const CACHE_FILE: &str = "commit_cache";

/// On-disk list of commit ids awaiting check-in, one per line.
///
/// `load` reads and deletes the file in one call; a crash between the two
/// loses the loaded ids unless a failure handler re-saves them (the engine
/// does exactly that on every egress failure).
#[derive(Debug, Clone)]
pub struct CommitCache {
    path: PathBuf,
}

impl CommitCache {
    pub fn new(metadata_dir: &Path) -> Self {
        Self {
            path: metadata_dir.join(CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached ids and delete the file. Missing file means no
    /// pending work.
    pub fn load(&self) -> io::Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let blob = fs::read_to_string(&self.path)?;
        fs::remove_file(&self.path)?;
        let ids: Vec<String> = blob
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Into::into)
            .collect();
        log::info!("loaded {} pending commit(s) from cache", ids.len());
        Ok(ids)
    }

    /// Persist a non-empty pending list; an empty list writes nothing.
    pub fn save(&self, ids: &[String]) -> io::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        log::info!("saving {} pending commit(s) to cache", ids.len());
        fs::write(&self.path, ids.join("\n"))
    }
}
