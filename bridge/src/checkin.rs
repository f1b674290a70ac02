use std::collections::BTreeSet;
use std::path::Path;

use gitcc_clearcase::ClearcaseView;
use gitcc_git::GitRepo;

use crate::diff::FileDiff;
use crate::error::BridgeError;

/// One git commit materialized as a reserved-checkout / update / check-in
/// transaction against the ClearCase view.
#[derive(Debug)]
pub struct CommitToClearcase {
    commit_id: String,
    comment: String,
    diffs: Vec<FileDiff>,
}

impl CommitToClearcase {
    pub fn new(
        git: &GitRepo,
        view_root: &Path,
        commit_id: &str,
        comment: &str,
    ) -> Result<Self, BridgeError> {
        let diffs = git
            .commit_diffs(commit_id)?
            .iter()
            .map(|diff| FileDiff::new(view_root, commit_id, diff))
            .collect();
        Ok(Self {
            commit_id: commit_id.to_string(),
            comment: comment.to_string(),
            diffs,
        })
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn diffs(&self) -> &[FileDiff] {
        &self.diffs
    }

    /// Union of the per-diff checkout lists, deduplicated.
    pub fn files_to_checkout(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.diffs.iter().flat_map(FileDiff::checkouts).collect();
        set.into_iter().cloned().collect()
    }

    /// Union of the per-diff check-in lists, deduplicated.
    pub fn files_to_checkin(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.diffs.iter().flat_map(FileDiff::checkins).collect();
        set.into_iter().cloned().collect()
    }

    /// Reserve every element this commit touches. On any contention the
    /// reservations already taken are undone and nothing is written.
    pub fn checkout_files(&self, cc: &ClearcaseView) -> Result<(), BridgeError> {
        let mut reserved = Vec::new();
        let mut contested = Vec::new();
        let mut detail = String::new();

        for path in self.files_to_checkout() {
            match cc.checkout(&path) {
                Ok(()) => reserved.push(path),
                Err(err) => {
                    detail = err.to_string();
                    contested.push(path);
                }
            }
        }

        if contested.is_empty() {
            return Ok(());
        }
        for path in &reserved {
            if let Err(err) = cc.undo_checkout(path) {
                log::error!("could not undo checkout of {path}: {err}");
            }
        }
        Err(BridgeError::CheckoutReserved {
            paths: contested,
            detail,
        })
    }

    /// Apply every diff to the view working area. Any failure undoes all
    /// reservations so no partial check-in can follow.
    pub fn update_files(&self, git: &GitRepo, cc: &ClearcaseView) -> Result<(), BridgeError> {
        for diff in &self.diffs {
            if let Err(err) = diff.update_cc_area(git, cc) {
                for path in self.files_to_checkout() {
                    if let Err(undo) = cc.undo_checkout(&path) {
                        log::error!("could not undo checkout of {path}: {undo}");
                    }
                }
                return Err(BridgeError::UpdateCcArea {
                    commit: self.commit_id.clone(),
                    detail: err.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check in every touched element with the commit message as comment.
    pub fn checkin_files(&self, cc: &ClearcaseView) -> Result<(), BridgeError> {
        for path in self.files_to_checkin() {
            cc.checkin(&path, &self.comment)?;
            log::debug!("checked in to ClearCase file {path}");
        }
        Ok(())
    }
}
