/// Workflow Management Layer
///
/// Workflow definitions as the engine sees them, their SQLite persistence, and the
/// lock-free hot-reload registry that resolves webhook triggers to workflows.

// Core workflow type definitions
pub mod types;

// SQLite persistence layer for workflows and webhook routes
pub mod storage;

// Hot-reload registry using ArcSwap for zero-downtime updates
pub mod registry;

pub use registry::{CompiledWorkflow, WorkflowRegistry};
pub use storage::{WebhookRoute, WorkflowStorage};
pub use types::{Connection, Connections, Node, Workflow, WorkflowStatus};
