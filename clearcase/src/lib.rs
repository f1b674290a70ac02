pub mod error;
pub mod models;
pub mod view;

pub use error::CcError;
pub use models::{uncataloged_target, HistoryRecord, RecordOp, UNCATALOGED_PREFIX};
pub use view::ClearcaseView;
