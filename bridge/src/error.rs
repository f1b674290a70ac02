use std::path::PathBuf;

use gitcc_clearcase::CcError;
use gitcc_git::GitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("could not merge commit {commit} onto branch {branch}: {detail}")]
    MergeConflict {
        commit: String,
        branch: String,
        detail: String,
    },

    #[error("could not checkout reserved [{}]: {detail}", paths.join(", "))]
    CheckoutReserved { paths: Vec<String>, detail: String },

    #[error("could not update the view for commit {commit}: {detail}")]
    UpdateCcArea { commit: String, detail: String },

    #[error("git repository already exists at {}", .0.display())]
    RepoExists(PathBuf),

    #[error("another bridge invocation holds the lock at {}", .0.display())]
    Locked(PathBuf),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Clearcase(#[from] CcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
