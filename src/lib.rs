/// hookflow: webhook-triggered workflow execution engine
///
/// A workflow is a graph of typed nodes (trigger, HTTP call, email, chat message,
/// condition). An inbound webhook starts a run that walks the graph concurrently,
/// records every node's outcome, and finalizes the run exactly once.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// SQLite bootstrap and schema
pub mod db;

// Workflow definitions, storage, and hot-reload registry
pub mod workflow;

// Durable execution records
pub mod execution;

// User-scoped credential lookup for message nodes
pub mod credentials;

// Runtime execution engine - graph walk and node executors
pub mod runtime;

// HTTP API layer - webhook ingress and execution lookup
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{EngineError, Result};
pub use execution::{Execution, ExecutionStatus, NodeExecutionRecord, NodeRunStatus};
pub use runtime::{ExecutionEngine, ExecutorRegistry, NodeExecutor, NodeOutcome};
pub use server::start_server;
pub use workflow::{Node, Workflow, WorkflowStatus};
