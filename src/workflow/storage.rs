/// SQLite persistence layer for workflow definitions and webhook routes
///
/// The authoring layer owns these tables; the engine reads them. Writes here exist
/// for seeding and for deployments where the engine and authoring layer share a process.
/// Workflows are stored as JSON for flexibility while keeping indexed lookup fields.

use crate::error::{EngineError, Result};
use crate::workflow::types::Workflow;
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashMap;

/// Route registered for a trigger node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRoute {
    pub webhook_id: String,
    /// Uppercase HTTP method
    pub method: String,
    pub workflow_id: i64,
    pub node_id: String,
}

/// SQLite-based workflow storage manager
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    pool: SqlitePool,
}

impl WorkflowStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new workflow or update existing one
    ///
    /// Uses UPSERT to handle both create and update atomically. The definition column
    /// holds the full workflow JSON; status and owner are mirrored for queries.
    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<()> {
        let definition_json = serde_json::to_string(workflow)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, status, definition, trigger_count, user_id, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                definition = excluded.definition,
                user_id = excluded.user_id,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(workflow.id)
        .bind(&workflow.name)
        .bind(workflow.status.as_str())
        .bind(&definition_json)
        .bind(workflow.trigger_count)
        .bind(&workflow.user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register (or re-point) the route for a trigger node
    pub async fn register_webhook(&self, route: &WebhookRoute) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhooks (id, method, workflow_id, node_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id, method) DO UPDATE SET
                workflow_id = excluded.workflow_id,
                node_id = excluded.node_id
            "#,
        )
        .bind(&route.webhook_id)
        .bind(route.method.to_uppercase())
        .bind(route.workflow_id)
        .bind(&route.node_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieve a workflow by ID
    pub async fn get_workflow(&self, id: i64) -> Result<Option<Workflow>> {
        let row = sqlx::query("SELECT definition, trigger_count FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::decode_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Load all workflows for registry initialization
    pub async fn load_all_workflows(&self) -> Result<HashMap<i64, Workflow>> {
        let rows = sqlx::query("SELECT definition, trigger_count FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        let mut workflows = HashMap::new();
        for row in rows {
            let workflow = Self::decode_row(&row)?;
            workflows.insert(workflow.id, workflow);
        }

        Ok(workflows)
    }

    /// Webhook routes pointing at `workflow_id`
    pub async fn webhooks_for_workflow(&self, workflow_id: i64) -> Result<Vec<WebhookRoute>> {
        let rows = sqlx::query("SELECT id, method, workflow_id, node_id FROM webhooks WHERE workflow_id = ?")
            .bind(workflow_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::decode_route).collect())
    }

    /// All registered webhook routes
    pub async fn load_all_webhooks(&self) -> Result<Vec<WebhookRoute>> {
        let rows = sqlx::query("SELECT id, method, workflow_id, node_id FROM webhooks")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::decode_route).collect())
    }

    /// Delete a workflow and its webhook routes
    pub async fn delete_workflow(&self, id: i64) -> Result<bool> {
        sqlx::query("DELETE FROM webhooks WHERE workflow_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Workflow> {
        let definition_json: String = row.get("definition");
        let mut workflow: Workflow = serde_json::from_str(&definition_json)
            .map_err(|e| EngineError::Internal(format!("corrupt workflow definition: {}", e)))?;
        // The counter column is authoritative; the JSON copy goes stale on increments.
        workflow.trigger_count = row.get("trigger_count");
        Ok(workflow)
    }

    fn decode_route(row: &sqlx::sqlite::SqliteRow) -> WebhookRoute {
        WebhookRoute {
            webhook_id: row.get("id"),
            method: row.get("method"),
            workflow_id: row.get("workflow_id"),
            node_id: row.get("node_id"),
        }
    }
}
