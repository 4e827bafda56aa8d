/// Webhook-triggered graph execution engine
///
/// `trigger` validates the inbound event synchronously, creates the execution record
/// and returns its id; the graph walk then runs on a detached tokio task. The walk
/// follows `main` connections from the trigger node, fanning out to every target
/// of the selected output slot concurrently, and finalizes the record exactly once.

use crate::error::{EngineError, Result};
use crate::execution::{ExecutionStatus, ExecutionStore, NodeExecutionRecord, NodeRunStatus};
use crate::runtime::context::ExecutionContext;
use crate::runtime::executor::NodeOutcome;
use crate::runtime::registry::ExecutorRegistry;
use crate::workflow::types::main_targets;
use crate::workflow::{Node, Workflow, WorkflowRegistry, WorkflowStatus};
use chrono::Utc;
use serde_json::Value;
use std::{future::Future, pin::Pin, sync::Arc, time::Instant};
use tokio::task::JoinSet;

type BranchFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Entry point for trigger events
pub struct ExecutionEngine {
    workflows: Arc<WorkflowRegistry>,
    executors: Arc<ExecutorRegistry>,
    store: Arc<dyn ExecutionStore>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("workflows", &self.workflows.workflow_count())
            .field("executors", &self.executors)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(
        workflows: Arc<WorkflowRegistry>,
        executors: Arc<ExecutorRegistry>,
        store: Arc<dyn ExecutionStore>,
    ) -> Self {
        Self {
            workflows,
            executors,
            store,
        }
    }

    /// Start a run for `(webhook_id, method)` and return its execution id
    ///
    /// Lookup and validation failures are returned before any record exists. Once the
    /// record is created the walk is detached: its outcome is only visible through the
    /// execution store.
    pub async fn trigger(&self, webhook_id: &str, method: &str, payload: Value) -> Result<String> {
        let compiled = self
            .workflows
            .find_by_webhook(webhook_id, method)
            .ok_or_else(|| EngineError::NotFound(format!("Webhook not found: {}", webhook_id)))?;
        let workflow = Arc::clone(&compiled.workflow);

        if workflow.status != WorkflowStatus::Active {
            return Err(EngineError::InvalidState(format!("Workflow {} is not active", workflow.id)));
        }

        if compiled.has_cycle {
            return Err(EngineError::InvalidState(format!(
                "Workflow {} contains a connection cycle",
                workflow.id
            )));
        }

        let trigger_node_id = workflow
            .trigger_node(webhook_id)
            .map(|node| node.id.clone())
            .ok_or_else(|| EngineError::NotFound(format!("Trigger node not found for webhook: {}", webhook_id)))?;

        let execution_id = self.store.create(workflow.id, &workflow.user_id, &payload).await?;

        tracing::info!(
            "🚀 Starting execution {} of workflow {} from trigger {}",
            execution_id,
            workflow.id,
            trigger_node_id
        );

        let ctx = Arc::new(ExecutionContext::new(
            execution_id.clone(),
            workflow.id,
            workflow.user_id.clone(),
            payload,
        ));
        let walk = Arc::new(Walk {
            workflow,
            executors: Arc::clone(&self.executors),
            store: Arc::clone(&self.store),
            ctx,
        });

        tokio::spawn(run_to_completion(walk, trigger_node_id));

        Ok(execution_id)
    }
}

/// Everything one run needs, shared by all of its branches
struct Walk {
    workflow: Arc<Workflow>,
    executors: Arc<ExecutorRegistry>,
    store: Arc<dyn ExecutionStore>,
    ctx: Arc<ExecutionContext>,
}

async fn run_to_completion(walk: Arc<Walk>, trigger_node_id: String) {
    let started = Instant::now();
    let execution_id = walk.ctx.execution_id.clone();
    let input = walk.ctx.trigger_data.clone();

    let (status, error) = match walk_node(Arc::clone(&walk), trigger_node_id, input).await {
        Ok(()) => (ExecutionStatus::Completed, None),
        Err(e) => (ExecutionStatus::Failed, Some(e.to_string())),
    };

    walk.ctx.set_status(status);
    if let Err(e) = walk.store.complete(&execution_id, status, error.as_deref()).await {
        tracing::error!("❌ Failed to finalize execution {}: {}", execution_id, e);
        return;
    }

    match error {
        None => tracing::info!("🎉 Execution {} completed in {:?}", execution_id, started.elapsed()),
        Some(e) => tracing::error!("💥 Execution {} failed after {:?}: {}", execution_id, started.elapsed(), e),
    }
}

/// Execute `node_id`, then every target of the slot it selects
///
/// Waits for all spawned branches and reports the first failure among them.
fn walk_node(walk: Arc<Walk>, node_id: String, input: Value) -> BranchFuture {
    Box::pin(async move {
        let Some(node) = walk.workflow.node(&node_id) else {
            tracing::warn!("⚠️ Node not found in workflow {}: {}", walk.workflow.id, node_id);
            return Ok(());
        };

        let (outcome, slot) = walk.execute_node(node, &input).await?;
        if !outcome.success && !node.continues_on_fail() {
            return Err(anyhow::anyhow!(
                "Node {} failed: {}",
                node.name,
                outcome.error.as_deref().unwrap_or("unknown error")
            ));
        }

        let targets = main_targets(&walk.workflow.connections, &node.id, slot);
        if targets.is_empty() {
            tracing::debug!("🏁 No next nodes for {} (slot {})", node.id, slot);
            return Ok(());
        }

        let mut branches = JoinSet::new();
        let mut first_error = None;
        for connection in targets {
            let Some(target) = walk.workflow.node(&connection.node) else {
                tracing::warn!("⚠️ Next node not found: {}", connection.node);
                continue;
            };

            if target.is_disabled() {
                tracing::info!("⏭️ Skipping disabled node: {}", target.name);
                // Spawned siblings keep running; the error is reported after the drain
                if let Err(e) = walk.record_skipped(target, &outcome.output).await {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                continue;
            }

            branches.spawn(walk_node(Arc::clone(&walk), target.id.clone(), outcome.output.clone()));
        }

        while let Some(joined) = branches.join_next().await {
            let result = joined
                .map_err(|e| anyhow::anyhow!("Branch task aborted: {}", e))
                .and_then(|branch| branch);

            if let Err(e) = result {
                match first_error {
                    None => first_error = Some(e),
                    Some(_) => tracing::debug!("🔇 Additional branch failure under {}: {}", node.id, e),
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    })
}

impl Walk {
    /// Run one node, store its output and append its record
    ///
    /// Returns the outcome together with the `main` slot to follow.
    async fn execute_node(&self, node: &Node, input: &Value) -> anyhow::Result<(NodeOutcome, usize)> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let (outcome, slot) = match self.executors.get_executor(&node.node_type) {
            Ok(executor) => {
                let outcome = executor.execute(node, &self.ctx, input).await;
                let slot = executor.output_slot(&outcome.output);
                (outcome, slot)
            }
            Err(e) => {
                tracing::error!("❌ No executor for node {} ({}): {}", node.name, node.node_type, e);
                (NodeOutcome::failure(e), 0)
            }
        };

        self.ctx.set_node_output(&node.id, outcome.output.clone());

        let record = NodeExecutionRecord {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            node_type: node.node_type.clone(),
            status: if outcome.success {
                NodeRunStatus::Success
            } else {
                NodeRunStatus::Failed
            },
            input: input.clone(),
            output: outcome.output.clone(),
            error: outcome.error.clone(),
            started_at,
            completed_at: Utc::now(),
            execution_time: timer.elapsed().as_millis() as i64,
        };
        self.append(record).await?;

        Ok((outcome, slot))
    }

    async fn record_skipped(&self, node: &Node, input: &Value) -> anyhow::Result<()> {
        let now = Utc::now();
        self.append(NodeExecutionRecord {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            node_type: node.node_type.clone(),
            status: NodeRunStatus::Skipped,
            input: input.clone(),
            output: Value::Null,
            error: None,
            started_at: now,
            completed_at: now,
            execution_time: 0,
        })
        .await
    }

    async fn append(&self, record: NodeExecutionRecord) -> anyhow::Result<()> {
        self.store
            .append_node_record(&self.ctx.execution_id, &record)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to record execution of node {}: {}", record.node_name, e))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;
    use crate::credentials::CredentialStore;
    use crate::execution::Execution;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct NoCredentials;

    #[async_trait]
    impl CredentialStore for NoCredentials {
        async fn get(&self, credential_id: i64, _user_id: &str) -> Result<Value> {
            Err(EngineError::NotFound(format!("Credential not found: {}", credential_id)))
        }
    }

    /// Appends for `slow_node` take a while; SKIPPED appends are rejected
    #[derive(Default)]
    struct FlakyStore {
        records: Mutex<Vec<NodeExecutionRecord>>,
        slow_node: &'static str,
    }

    #[async_trait]
    impl ExecutionStore for FlakyStore {
        async fn create(&self, _workflow_id: i64, _user_id: &str, _trigger_data: &Value) -> Result<String> {
            Ok("exec-1".to_string())
        }

        async fn append_node_record(&self, _execution_id: &str, record: &NodeExecutionRecord) -> Result<()> {
            if record.status == NodeRunStatus::Skipped {
                return Err(EngineError::Internal("disk full".to_string()));
            }
            if record.node_id == self.slow_node {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn complete(&self, _execution_id: &str, _status: ExecutionStatus, _error: Option<&str>) -> Result<()> {
            Ok(())
        }

        async fn get(&self, execution_id: &str) -> Result<Execution> {
            Err(EngineError::NotFound(format!("Execution not found: {}", execution_id)))
        }

        async fn list_by_workflow(&self, _workflow_id: i64, _limit: u32) -> Result<Vec<Execution>> {
            Ok(Vec::new())
        }
    }

    fn walk(workflow: Workflow, store: Arc<FlakyStore>, trigger_data: Value) -> Arc<Walk> {
        Arc::new(Walk {
            workflow: Arc::new(workflow),
            executors: Arc::new(ExecutorRegistry::new(Arc::new(NoCredentials), ExecutorConfig::default())),
            store,
            ctx: Arc::new(ExecutionContext::new("exec-1".into(), 1, "u1".into(), trigger_data)),
        })
    }

    fn workflow(nodes: Value, connections: Value) -> Workflow {
        serde_json::from_value(json!({
            "id": 1,
            "name": "wf",
            "status": "ACTIVE",
            "userId": "u1",
            "nodes": nodes,
            "connections": connections
        }))
        .unwrap()
    }

    fn node(id: &str, extra: Value) -> Value {
        let mut node = json!({"id": id, "name": id, "type": "trigger", "parameters": {}});
        if let (Some(target), Some(extra)) = (node.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        node
    }

    #[tokio::test]
    async fn failed_skip_record_does_not_cancel_spawned_siblings() {
        let wf = workflow(
            json!([node("t", json!({})), node("busy", json!({})), node("off", json!({"disabled": true}))]),
            json!({"t": {"main": [[
                {"node": "busy", "type": "main", "index": 0},
                {"node": "off", "type": "main", "index": 0}
            ]]}}),
        );
        let store = Arc::new(FlakyStore {
            slow_node: "busy",
            ..Default::default()
        });

        let result = walk_node(walk(wf, store.clone(), json!({})), "t".into(), json!({})).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to record execution of node off"), "{}", err);
        let recorded: Vec<String> = store.records.lock().unwrap().iter().map(|r| r.node_id.clone()).collect();
        assert_eq!(recorded, vec!["t".to_string(), "busy".to_string()]);
    }

    #[tokio::test]
    async fn payload_cannot_pick_the_trigger_slot() {
        let wf = workflow(
            json!([node("t", json!({})), node("next", json!({}))]),
            json!({"t": {"main": [
                [{"node": "next", "type": "main", "index": 0}],
                []
            ]}}),
        );
        let store = Arc::new(FlakyStore::default());
        let payload = json!({"selectedOutput": 1, "x": 1});

        walk_node(walk(wf, store.clone(), payload.clone()), "t".into(), payload)
            .await
            .unwrap();

        assert_eq!(store.records.lock().unwrap().len(), 2);
    }
}
