/// Durable execution-record collaborator
///
/// The engine talks to the store through the `ExecutionStore` trait so tests can
/// substitute fakes. `SqliteExecutionStore` is the production implementation.

use crate::error::{EngineError, Result};
use crate::execution::types::{Execution, ExecutionStatus, NodeExecutionRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, Row};
use std::str::FromStr;

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Create a `RUNNING` execution and return its id
    async fn create(&self, workflow_id: i64, user_id: &str, trigger_data: &Value) -> Result<String>;

    /// Append one record to the execution's log. Concurrent appends must all land.
    async fn append_node_record(&self, execution_id: &str, record: &NodeExecutionRecord) -> Result<()>;

    /// Set the terminal status. A completed execution is never mutated again.
    async fn complete(&self, execution_id: &str, status: ExecutionStatus, error: Option<&str>) -> Result<()>;

    async fn get(&self, execution_id: &str) -> Result<Execution>;

    /// Most recent first
    async fn list_by_workflow(&self, workflow_id: i64, limit: u32) -> Result<Vec<Execution>>;
}

/// SQLite-backed execution store
///
/// The node log lives in a JSON column. Appends use SQLite's `json_insert(..., '$[#]', ...)`
/// in a single UPDATE, so concurrent writers for the same execution serialize on the
/// row without a read-modify-write window.
#[derive(Debug, Clone)]
pub struct SqliteExecutionStore {
    pool: SqlitePool,
}

impl SqliteExecutionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Execution> {
        let status: String = row.get("status");
        let trigger_data: String = row.get("trigger_data");
        let node_executions: String = row.get("node_executions");
        let started_at: String = row.get("started_at");
        let completed_at: Option<String> = row.get("completed_at");

        Ok(Execution {
            id: row.get("id"),
            workflow_id: row.get("workflow_id"),
            user_id: row.get("user_id"),
            status: ExecutionStatus::from_str(&status).map_err(EngineError::Internal)?,
            trigger_data: serde_json::from_str(&trigger_data)?,
            node_executions: serde_json::from_str(&node_executions)?,
            error: row.get("error"),
            started_at: parse_timestamp(&started_at)?,
            completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Fixed-width UTC timestamps keep lexical order equal to time order
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| EngineError::Internal(format!("corrupt timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl ExecutionStore for SqliteExecutionStore {
    async fn create(&self, workflow_id: i64, user_id: &str, trigger_data: &Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO executions (id, workflow_id, user_id, status, trigger_data, node_executions, started_at)
            VALUES (?, ?, ?, ?, ?, '[]', ?)
            "#,
        )
        .bind(&id)
        .bind(workflow_id)
        .bind(user_id)
        .bind(ExecutionStatus::Running.as_str())
        .bind(serde_json::to_string(trigger_data)?)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        tracing::debug!("📝 Created execution record {} for workflow {}", id, workflow_id);

        Ok(id)
    }

    async fn append_node_record(&self, execution_id: &str, record: &NodeExecutionRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET node_executions = json_insert(node_executions, '$[#]', json(?))
            WHERE id = ? AND completed_at IS NULL
            "#,
        )
        .bind(serde_json::to_string(record)?)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_closed(execution_id).await);
        }

        Ok(())
    }

    async fn complete(&self, execution_id: &str, status: ExecutionStatus, error: Option<&str>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = ?, error = ?, completed_at = ?
            WHERE id = ? AND completed_at IS NULL
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(now_timestamp())
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_closed(execution_id).await);
        }

        Ok(())
    }

    async fn get(&self, execution_id: &str) -> Result<Execution> {
        let row = sqlx::query(
            r#"
            SELECT id, workflow_id, user_id, status, trigger_data, node_executions, error, started_at, completed_at
            FROM executions
            WHERE id = ?
            "#,
        )
        .bind(execution_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::decode_row(&row),
            None => Err(EngineError::NotFound(format!("Execution not found: {}", execution_id))),
        }
    }

    async fn list_by_workflow(&self, workflow_id: i64, limit: u32) -> Result<Vec<Execution>> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, user_id, status, trigger_data, node_executions, error, started_at, completed_at
            FROM executions
            WHERE workflow_id = ?
            ORDER BY started_at DESC
            LIMIT ?
            "#,
        )
        .bind(workflow_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_row).collect()
    }
}

impl SqliteExecutionStore {
    async fn missing_or_closed(&self, execution_id: &str) -> EngineError {
        match self.get(execution_id).await {
            Ok(_) => EngineError::InvalidState(format!("Execution already completed: {}", execution_id)),
            Err(e) => e,
        }
    }
}
