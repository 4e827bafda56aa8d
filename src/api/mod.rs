/// HTTP API layer
///
/// Webhook ingress plus the read-side endpoints used to inspect runs:
/// - `ANY /webhook/handler/{id}` starts a run
/// - `GET /executions/{id}` and `GET /executions/workflow/{id}` read execution records
/// - `POST /api/workflows/{id}/reload` hot-reloads a workflow after an external write

use crate::execution::ExecutionStore;
use crate::runtime::ExecutionEngine;
use crate::workflow::WorkflowRegistry;
use axum::Router;
use std::sync::Arc;

// Webhook trigger endpoint
pub mod webhooks;

// Execution record lookup
pub mod executions;

// Workflow hot-reload hook
pub mod workflows;

pub use executions::create_execution_routes;
pub use webhooks::create_webhook_routes;
pub use workflows::create_workflow_routes;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    pub executions: Arc<dyn ExecutionStore>,
    pub workflows: Arc<WorkflowRegistry>,
}

/// All API routes with state applied
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .merge(create_webhook_routes())
        .merge(create_execution_routes())
        .merge(create_workflow_routes())
        .with_state(state)
}
