pub mod error;
pub mod models;
pub mod repo;

pub use error::GitError;
pub use models::{CommitDiff, CommitIdentity, LogEntry};
pub use repo::GitRepo;
