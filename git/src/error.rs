use gitcc_exec::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("nothing staged to commit")]
    NothingToCommit,

    #[error("failed to parse git output: {0}")]
    Parse(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
