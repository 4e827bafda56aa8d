/// Workflow hot-reload hook
///
/// Workflows are authored elsewhere and written straight to the shared database.
/// After such a write the authoring layer calls this endpoint so the registry swaps
/// in the new definition without a restart.

use crate::api::AppState;
use crate::error::EngineError;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{post, Router},
};
use serde_json::{json, Value};

pub fn create_workflow_routes() -> Router<AppState> {
    Router::new().route("/api/workflows/{workflow_id}/reload", post(reload_workflow))
}

/// POST /api/workflows/{id}/reload
///
/// A workflow that no longer exists is dropped from the registry and reported as 404.
async fn reload_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<i64>,
) -> Result<Json<Value>, EngineError> {
    state.workflows.reload_workflow(workflow_id).await?;

    Ok(Json(json!({
        "success": true,
        "workflowId": workflow_id,
        "message": "Workflow reloaded",
    })))
}
