/// Webhook trigger endpoint
///
/// Any HTTP method on `/webhook/handler/{id}` starts a run of the workflow routed to
/// `(id, method)`. The response only acknowledges the start; the run's progress is
/// read back through the execution endpoints.

use crate::api::AppState;
use crate::error::EngineError;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::Method,
    response::Json,
    routing::{any, Router},
};
use serde_json::{json, Map, Value};

pub fn create_webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/handler/{webhook_id}", any(handle_webhook))
}

/// Start a workflow run
///
/// Body: optional JSON payload. An empty or unparseable body becomes `{}`.
async fn handle_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    method: Method,
    body: Bytes,
) -> Result<Json<Value>, EngineError> {
    tracing::info!("📥 Webhook request received: {} {}", method, webhook_id);

    let payload = parse_payload(&body);
    tracing::debug!("📄 Trigger payload: {}", payload);

    let execution_id = state.engine.trigger(&webhook_id, method.as_str(), payload).await.map_err(|e| {
        tracing::warn!("❌ Webhook {} {} rejected: {}", method, webhook_id, e);
        e
    })?;

    Ok(Json(json!({
        "success": true,
        "executionId": execution_id,
        "message": "Workflow execution started",
    })))
}

fn parse_payload(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Null) => Value::Object(Map::new()),
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("⚠️ Invalid JSON webhook body, using empty payload: {}", e);
            Value::Object(Map::new())
        }
    }
}
