use std::collections::{BTreeMap, HashSet};

use chrono::Local;

use crate::changeset::{Change, ChangeSet};
use crate::engine::{Bridge, TRACKING_BRANCH};
use crate::error::BridgeError;

/// Sentinel author of synthetic alignment commits.
pub const RECONCILE_USER: &str = "unknown";
/// Comment of synthetic alignment commits.
pub const RECONCILE_COMMENT: &str = "Anonymous file changes in Clearcase";

impl Bridge {
    /// Discover silent divergence between the view and the tracking branch
    /// and commit a synthetic change-set repairing it. This is how
    /// ClearCase-side renames (visible only as delete + add) end up in git.
    ///
    /// Running it twice in a row commits nothing the second time.
    pub fn align(&mut self) -> Result<Vec<String>, BridgeError> {
        let (additions, deletions) = self.sync_report()?;
        if additions.is_empty() && deletions.is_empty() {
            log::info!("git and ClearCase are aligned");
            return Ok(Vec::new());
        }

        log::info!(
            "found repository discrepancies ({} only in ClearCase, {} only in git) - aligning",
            additions.len(),
            deletions.len()
        );
        let now = Local::now().naive_local();
        let mut set = ChangeSet::new(RECONCILE_USER, RECONCILE_COMMENT);
        for (path, version) in additions {
            set.push(Change::Modify {
                time: now,
                path,
                version,
            });
        }
        for path in deletions {
            set.push(Change::Delete { time: now, path });
        }
        self.commit_changesets(&[set])
    }

    /// Files present only in the view (with their versions) and files
    /// present only on the tracking branch, ignore list applied.
    fn sync_report(&self) -> Result<(BTreeMap<String, String>, Vec<String>), BridgeError> {
        let snapshot = self.cc.file_versions()?;
        self.git.checkout(TRACKING_BRANCH)?;
        let tracked: HashSet<String> = self
            .git
            .tracked_files()?
            .into_iter()
            .filter(|path| !self.ignore.contains(path))
            .collect();

        let additions: BTreeMap<String, String> = snapshot
            .iter()
            .filter(|(path, _)| !tracked.contains(*path))
            .map(|(path, version)| (path.clone(), version.clone()))
            .collect();
        let mut deletions: Vec<String> = tracked
            .into_iter()
            .filter(|path| !snapshot.contains_key(path))
            .collect();
        deletions.sort();

        Ok((additions, deletions))
    }
}
