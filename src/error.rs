/// Engine error taxonomy
///
/// Every failure the engine, the stores, or a node executor can produce maps to
/// one of these kinds. Node executors convert them into failed node outcomes;
/// trigger-time errors are surfaced to the webhook caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Workflow, webhook, node, execution or credential absent
    #[error("{0}")]
    NotFound(String),

    /// Workflow not runnable in its current state
    #[error("{0}")]
    InvalidState(String),

    /// Credential ownership mismatch
    #[error("{0}")]
    Unauthorized(String),

    /// Unknown node type
    #[error("Unsupported node type: {0}")]
    Unsupported(String),

    /// Missing or malformed node parameters
    #[error("{0}")]
    Validation(String),

    /// Non-2xx or transport failure from a third-party call
    #[error("{0}")]
    Remote(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidState(_) => StatusCode::CONFLICT,
            EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
            EngineError::Unsupported(_) | EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Remote(_) => StatusCode::BAD_GATEWAY,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Internal(format!("database error: {}", e))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Internal(format!("json error: {}", e))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EngineError::Remote(format!("request timed out: {}", e))
        } else {
            EngineError::Remote(format!("request failed: {}", e))
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
