use std::io::Write;

use chrono::NaiveDate;
use gitcc_git::CommitIdentity;

use crate::engine::{Bridge, MAINLINE_BRANCH};
use crate::error::BridgeError;

/// Date layout of the `time` rule in a config spec and of the CLI
/// `init`/`clone` argument.
pub const SINCE_DATE_FORMAT: &str = "%d-%b-%Y";

impl Bridge {
    /// Bootstrap a brand-new bridge: pin the view at `since` with a
    /// temporary config spec, import the snapshot into a fresh git
    /// repository, restore the original spec and ingest everything newer.
    pub fn init_bridge(&mut self, since: NaiveDate) -> Result<(), BridgeError> {
        if self.git.exists() {
            return Err(BridgeError::RepoExists(self.git.work_dir().to_path_buf()));
        }

        let saved = self.cc.cat_cs()?;
        let pinned = format!("time {}\n{}", since.format(SINCE_DATE_FORMAT), saved);
        self.activate_config_spec(&pinned)?;
        let imported = self.clone_snapshot(since);
        self.activate_config_spec(&saved)?;
        imported?;

        self.sync_to_git()?;
        Ok(())
    }

    /// Import every versioned element of the view into a fresh git
    /// repository as one snapshot commit dated `since`.
    pub fn clone_snapshot(&mut self, since: NaiveDate) -> Result<(), BridgeError> {
        self.git.init(MAINLINE_BRANCH)?;
        let versions = self.cc.file_versions()?;
        log::info!("importing {} versioned file(s) from the view", versions.len());

        let mut paths: Vec<&String> = versions.keys().collect();
        paths.sort();
        for path in paths {
            let version = &versions[path];
            let dest = self.git.work_dir().join(path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.cc.get_file(&format!("{path}@@{version}"), &dest)?;
            self.git.add_file(path)?;
        }

        let date = since.and_time(chrono::NaiveTime::MIN);
        let identity = CommitIdentity {
            name: "Anonymous".to_string(),
            email: format!("anonymous@{}", self.users.domain()),
            date,
        };
        self.git.commit(
            &format!("Repository snapshot at {}", since.format("%Y-%m-%d")),
            &identity,
        )?;
        Ok(())
    }

    fn activate_config_spec(&self, spec: &str) -> Result<(), BridgeError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(spec.as_bytes())?;
        log::info!("setting the config spec and updating the view; this may take several minutes...");
        self.cc.set_cs(file.path())?;
        log::info!("done setting the config spec");
        Ok(())
    }
}
