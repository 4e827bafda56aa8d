/// Runtime execution engine
///
/// This module turns a trigger event into a walk over a workflow's connection graph:
/// - Run-scoped state shared by concurrent branches
/// - `{{...}}` expression resolution and condition evaluation
/// - Node executors and the registry that hands them out
/// - The engine that spawns and finalizes each run

// Run-scoped state (trigger payload, node outputs, status)
pub mod context;

// Placeholder resolution against run state
pub mod expression;

// Rule groups for branch selection
pub mod condition;

// Per-type node handlers
pub mod executor;

// Lazily populated executor cache
pub mod registry;

// Trigger entry point and concurrent graph walk
pub mod engine;

pub use context::ExecutionContext;
pub use engine::ExecutionEngine;
pub use executor::{NodeExecutor, NodeOutcome};
pub use registry::ExecutorRegistry;
