use gitcc_exec::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CcError {
    #[error("failed to parse cleartool output: {0}")]
    Parse(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
