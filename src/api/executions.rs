/// Execution record endpoints

use crate::api::AppState;
use crate::error::EngineError;
use crate::execution::Execution;
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, Router},
};
use serde::Deserialize;

const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

pub fn create_execution_routes() -> Router<AppState> {
    Router::new()
        .route("/executions/{execution_id}", get(get_execution))
        .route("/executions/workflow/{workflow_id}", get(list_workflow_executions))
}

/// GET /executions/{id}
async fn get_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<Execution>, EngineError> {
    let execution = state.executions.get(&execution_id).await?;
    Ok(Json(execution))
}

/// GET /executions/workflow/{id}?limit=N, most recent first
async fn list_workflow_executions(
    State(state): State<AppState>,
    Path(workflow_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Execution>>, EngineError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    tracing::debug!("📋 Listing up to {} executions for workflow {}", limit, workflow_id);

    let executions = state.executions.list_by_workflow(workflow_id, limit).await?;
    Ok(Json(executions))
}
