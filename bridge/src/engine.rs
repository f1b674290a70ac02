use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Duration;
use gitcc_clearcase::ClearcaseView;
use gitcc_git::GitRepo;

use crate::cache::CommitCache;
use crate::changeset::{classify, ChangeSet};
use crate::checkin::CommitToClearcase;
use crate::error::BridgeError;
use crate::lock::BridgeLock;
use crate::users::UserMap;

/// Branch whose tip mirrors the latest known ClearCase state. Never pushed.
pub const TRACKING_BRANCH: &str = "clearcase";
/// Developer-visible branch, shared through the remote.
pub const MAINLINE_BRANCH: &str = "master";
/// Movable tag on the last commit successfully checked in to ClearCase.
/// Seen outside a run only when a check-in batch did not complete.
pub const CHECKPOINT_TAG: &str = "checkin-checkpoint";

/// Everything the engine needs, resolved by the caller up front.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub git_root: PathBuf,
    pub view_root: PathBuf,
    pub remote: Option<String>,
    pub include: Vec<String>,
    pub branches: Vec<String>,
    pub recursive: bool,
    pub coalesce_window_secs: u64,
    pub ignore: Vec<String>,
    pub users: HashMap<String, String>,
    pub user_domain: String,
}

/// The bridge state machine. One instance per invocation; an exclusive
/// on-disk lock keeps a second invocation out of the repository pair.
pub struct Bridge {
    pub(crate) git: GitRepo,
    pub(crate) cc: ClearcaseView,
    pub(crate) remote: Option<String>,
    pub(crate) users: UserMap,
    pub(crate) window: Duration,
    pub(crate) ignore: Vec<String>,
    pub(crate) cache: CommitCache,
    pub(crate) pending: Vec<String>,
    _lock: Option<BridgeLock>,
}

impl Bridge {
    pub fn new(opts: BridgeOptions) -> Result<Self, BridgeError> {
        let git = GitRepo::at(&opts.git_root);
        let cc = ClearcaseView::new(&opts.view_root, opts.include, opts.branches, opts.recursive);
        let lock = if git.exists() {
            Some(BridgeLock::acquire(&git.metadata_dir())?)
        } else {
            None
        };
        let cache = CommitCache::new(&git.metadata_dir());
        Ok(Self {
            git,
            cc,
            remote: opts.remote,
            users: UserMap::new(&opts.users, &opts.user_domain),
            window: Duration::seconds(opts.coalesce_window_secs as i64),
            ignore: opts.ignore,
            cache,
            pending: Vec::new(),
            _lock: lock,
        })
    }

    // Ingest: ClearCase -> git ----------------------------------------------

    /// Lift new ClearCase check-ins into commits on the tracking branch,
    /// fast-forward them onto the mainline and push.
    pub fn sync_to_git(&mut self) -> Result<Vec<String>, BridgeError> {
        self.load_pending()?;
        self.git.checkout(TRACKING_BRANCH)?;
        let tracking_head = self.git.branch_head(TRACKING_BRANCH)?;

        let changesets = self.pending_changesets()?;
        let commits = if changesets.is_empty() {
            log::info!("nothing to commit");
            Vec::new()
        } else {
            log::info!("committing ClearCase changes to git");
            self.commit_changesets(&changesets)?
        };

        if self.remote.is_some() {
            self.update_mainline_from_remote()?;
        }
        self.save_pending()?;

        if commits.is_empty() {
            return Ok(commits);
        }

        let main_head = self.git.branch_head(MAINLINE_BRANCH)?;
        if let Err(err) = self.merge_onto(MAINLINE_BRANCH, &commits) {
            self.git
                .reset_branches(&[(MAINLINE_BRANCH, &main_head), (TRACKING_BRANCH, &tracking_head)])?;
            return Err(err);
        }

        if let Some(remote) = self.remote.clone() {
            self.git.checkout(MAINLINE_BRANCH)?;
            self.git.push(&remote, MAINLINE_BRANCH)?;
        }
        Ok(commits)
    }

    /// Number of ClearCase check-in records newer than the tracking tip.
    pub fn pending_clearcase_changes(&self) -> Result<usize, BridgeError> {
        let since = self.git.commit_date(TRACKING_BRANCH)? + Duration::seconds(1);
        let history = self.cc.history_since(&since)?;
        log::info!("pending file changes in ClearCase: {}", history.len());
        Ok(history.len())
    }

    fn pending_changesets(&self) -> Result<Vec<ChangeSet>, BridgeError> {
        let since = self.git.commit_date(TRACKING_BRANCH)? + Duration::seconds(1);
        let history = self.cc.history_since(&since)?;
        Ok(classify(&history, self.window))
    }

    /// Commit each change-set to the tracking branch, in order. Sets that
    /// stage to no net change produce no commit.
    pub(crate) fn commit_changesets(
        &self,
        sets: &[ChangeSet],
    ) -> Result<Vec<String>, BridgeError> {
        self.git.checkout(TRACKING_BRANCH)?;
        let mut commits = Vec::new();
        for set in sets {
            if let Some(id) = set.commit_to_git(&self.git, &self.cc, &self.users)? {
                commits.push(id);
            }
        }
        Ok(commits)
    }

    // Egress: git -> ClearCase ----------------------------------------------

    /// Merge every pending commit onto the tracking branch and materialize
    /// each as a ClearCase check-in transaction.
    pub fn checkin_to_clearcase(&mut self) -> Result<(), BridgeError> {
        self.load_pending()?;
        let main_head = self.git.branch_head(MAINLINE_BRANCH)?;
        if self.remote.is_some() {
            self.update_mainline_from_remote()?;
        }
        if self.pending.is_empty() {
            log::info!("no pending commits to check in to ClearCase");
            return Ok(());
        }

        log::info!("checking in {} new commit(s) to ClearCase", self.pending.len());
        let tracking_head = self.git.branch_head(TRACKING_BRANCH)?;
        if let Err(err) = self.drain_pending(&tracking_head) {
            // Keep the pending list across the failure; the hard reset
            // below restores both branch heads.
            self.save_pending()?;
            self.git
                .reset_branches(&[(MAINLINE_BRANCH, &main_head), (TRACKING_BRANCH, &tracking_head)])?;
            return Err(err);
        }
        self.pending.clear();

        if self.cc.need_update()? {
            log::warn!("ClearCase view needs updating");
            self.cc.update()?;
            log::info!("ClearCase view updated");
        }
        self.git.reset_hard(MAINLINE_BRANCH)?;
        Ok(())
    }

    fn drain_pending(&mut self, tracking_head: &str) -> Result<(), BridgeError> {
        let pending = self.pending.clone();
        self.merge_onto(TRACKING_BRANCH, &pending)?;
        self.checkin_tracking_commits(tracking_head)
    }

    /// Check in every commit between `old_head` and the tracking tip,
    /// advancing the checkpoint tag after each one.
    fn checkin_tracking_commits(&self, old_head: &str) -> Result<(), BridgeError> {
        self.git.checkout(TRACKING_BRANCH)?;
        let entries = self.git.log_between(old_head, TRACKING_BRANCH)?;
        if entries.is_empty() {
            return Ok(());
        }

        log::info!("preparing to check in...");
        for entry in &entries {
            let transaction =
                CommitToClearcase::new(&self.git, self.cc.view_root(), &entry.id, &entry.message)?;
            transaction.checkout_files(&self.cc)?;
            transaction.update_files(&self.git, &self.cc)?;
            transaction.checkin_files(&self.cc)?;
            log::info!("checked in to ClearCase commit {:.7}", entry.id);
            self.git.set_tag(CHECKPOINT_TAG, &entry.id)?;
        }
        self.git.remove_tag(CHECKPOINT_TAG)?;
        Ok(())
    }

    // Shared plumbing -------------------------------------------------------

    /// Check out the branch and merge the commits onto it sequentially.
    /// A conflict aborts the in-progress merge and surfaces as
    /// `MergeConflict`; the caller resets the branches.
    fn merge_onto(&self, branch: &str, commits: &[String]) -> Result<(), BridgeError> {
        self.git.checkout(branch)?;
        for id in commits {
            let msg = self.git.commit_message(id)?;
            if let Err(err) = self.git.merge_commit_ff(id, &msg) {
                log::error!("merge of {:.7} onto {branch} failed: {err}", id);
                if let Err(abort) = self.git.merge_abort() {
                    log::debug!("merge abort: {abort}");
                }
                return Err(BridgeError::MergeConflict {
                    commit: id.clone(),
                    branch: branch.to_string(),
                    detail: err.to_string(),
                });
            }
            log::info!("merged on branch {branch} commit {:.7}", id);
        }
        Ok(())
    }

    /// Pull the remote mainline and remember any new commits for later
    /// check-in.
    fn update_mainline_from_remote(&mut self) -> Result<(), BridgeError> {
        let Some(remote) = self.remote.clone() else {
            return Ok(());
        };
        self.git.checkout(MAINLINE_BRANCH)?;
        let head = self.git.branch_head("HEAD")?;
        self.git.fetch(&remote)?;
        let remote_head = self.git.branch_head(&format!("{remote}/{MAINLINE_BRANCH}"))?;
        if head != remote_head {
            self.git.pull_rebase()?;
            for id in self.git.commits_between(&head, "HEAD")? {
                self.push_pending(id);
            }
        }
        Ok(())
    }

    // View passthroughs -----------------------------------------------------

    pub fn view_needs_update(&self) -> Result<bool, BridgeError> {
        Ok(self.cc.need_update()?)
    }

    pub fn update_view(&self) -> Result<(), BridgeError> {
        Ok(self.cc.update()?)
    }

    // Pending-commit bookkeeping --------------------------------------------

    pub(crate) fn load_pending(&mut self) -> Result<(), BridgeError> {
        for id in self.cache.load()? {
            self.push_pending(id);
        }
        Ok(())
    }

    pub(crate) fn push_pending(&mut self, id: String) {
        if !self.pending.contains(&id) {
            self.pending.push(id);
        }
    }

    pub(crate) fn save_pending(&self) -> Result<(), BridgeError> {
        Ok(self.cache.save(&self.pending)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(git_root: &std::path::Path) -> BridgeOptions {
        BridgeOptions {
            git_root: git_root.to_path_buf(),
            view_root: git_root.join("view"),
            remote: None,
            include: vec![".".to_string()],
            branches: vec!["main".to_string()],
            recursive: true,
            coalesce_window_secs: 4,
            ignore: Vec::new(),
            users: HashMap::new(),
            user_domain: "example.com".to_string(),
        }
    }

    #[test]
    fn test_push_pending_dedupes_in_order() {
        let dir = TempDir::new().unwrap();
        let mut bridge = Bridge::new(options(dir.path())).unwrap();

        bridge.push_pending("a".to_string());
        bridge.push_pending("b".to_string());
        bridge.push_pending("a".to_string());
        assert_eq!(bridge.pending, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_load_pending_merges_cache_and_memory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("commit_cache"), "a\nb\n").unwrap();

        let mut bridge = Bridge::new(options(dir.path())).unwrap();
        bridge.push_pending("b".to_string());
        bridge.load_pending().unwrap();

        assert_eq!(bridge.pending, vec!["b".to_string(), "a".to_string()]);
        assert!(!dir.path().join(".git").join("commit_cache").exists());
    }
}
