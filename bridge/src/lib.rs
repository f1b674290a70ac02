pub mod bootstrap;
pub mod cache;
pub mod changeset;
pub mod checkin;
pub mod diff;
pub mod engine;
pub mod error;
pub mod lock;
pub mod reconcile;
pub mod users;

pub use changeset::{classify, Change, ChangeSet};
pub use checkin::CommitToClearcase;
pub use diff::FileDiff;
pub use engine::{Bridge, BridgeOptions, CHECKPOINT_TAG, MAINLINE_BRANCH, TRACKING_BRANCH};
pub use error::BridgeError;
pub use users::UserMap;
