/// Execution records
///
/// The durable trace of each triggered run and the store that persists it.

pub mod store;
pub mod types;

pub use store::{ExecutionStore, SqliteExecutionStore};
pub use types::{Execution, ExecutionStatus, NodeExecutionRecord, NodeRunStatus};
