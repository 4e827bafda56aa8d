/// Hot-reload workflow registry using ArcSwap
///
/// Provides lock-free, atomic updates to the in-memory workflow registry.
/// Each update swaps the entire snapshot pointer, so triggers that are already
/// walking a workflow keep their `Arc` to the old definition while new triggers
/// see the new one.

use crate::error::{EngineError, Result};
use crate::workflow::storage::{WebhookRoute, WorkflowStorage};
use crate::workflow::types::{Workflow, MAIN_PORT};
use arc_swap::ArcSwap;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::{collections::HashMap, sync::Arc};

/// Lock-free workflow registry: the engine's workflow/webhook lookup collaborator
#[derive(Debug)]
pub struct WorkflowRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    storage: WorkflowStorage,
}

#[derive(Debug, Clone, Default)]
struct RegistrySnapshot {
    workflows: HashMap<i64, CompiledWorkflow>,
    /// (webhook id, uppercase method) -> workflow id
    routes: HashMap<(String, String), i64>,
}

/// Workflow plus what the engine needs to know before walking it
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub workflow: Arc<Workflow>,
    /// True when the `main` connection graph loops back on itself
    pub has_cycle: bool,
}

impl CompiledWorkflow {
    pub fn compile(workflow: Workflow) -> Self {
        let has_cycle = main_graph_has_cycle(&workflow);
        if has_cycle {
            tracing::warn!("🔁 Workflow {} contains a cycle and cannot be triggered", workflow.id);
        }

        Self {
            workflow: Arc::new(workflow),
            has_cycle,
        }
    }
}

impl WorkflowRegistry {
    pub fn new(storage: WorkflowStorage) -> Self {
        Self {
            snapshot: ArcSwap::new(Arc::new(RegistrySnapshot::default())),
            storage,
        }
    }

    /// Populate the registry from storage (startup)
    pub async fn init_from_storage(&self) -> Result<()> {
        let stored = self.storage.load_all_workflows().await?;
        let routes = self.storage.load_all_webhooks().await?;

        let mut next = RegistrySnapshot::default();
        for (id, workflow) in stored {
            next.workflows.insert(id, CompiledWorkflow::compile(workflow));
        }
        for route in routes {
            next.routes.insert(route_key(&route.webhook_id, &route.method), route.workflow_id);
        }

        let (workflow_count, route_count) = (next.workflows.len(), next.routes.len());
        self.snapshot.store(Arc::new(next));

        tracing::info!(
            "📊 Initialized workflow registry with {} workflows and {} webhook routes",
            workflow_count,
            route_count
        );

        Ok(())
    }

    /// Hot-reload a single workflow and its webhook routes
    ///
    /// A workflow that no longer exists in storage is dropped from the registry
    /// and reported as `NotFound`.
    pub async fn reload_workflow(&self, workflow_id: i64) -> Result<()> {
        let Some(workflow) = self.storage.get_workflow(workflow_id).await? else {
            self.remove_workflow(workflow_id);
            return Err(EngineError::NotFound(format!("Workflow not found: {}", workflow_id)));
        };
        let routes = self.storage.webhooks_for_workflow(workflow_id).await?;
        let compiled = CompiledWorkflow::compile(workflow);

        self.snapshot.rcu(|current| {
            let mut next = (**current).clone();
            next.routes.retain(|_, id| *id != workflow_id);
            for route in &routes {
                next.routes.insert(route_key(&route.webhook_id, &route.method), workflow_id);
            }
            next.workflows.insert(workflow_id, compiled.clone());
            next
        });

        tracing::info!("🔥 Hot-reloaded workflow: {} ({} webhook routes)", workflow_id, routes.len());

        Ok(())
    }

    /// Save through storage and reload in one step
    pub async fn publish(&self, workflow: &Workflow, routes: &[WebhookRoute]) -> Result<()> {
        self.storage.save_workflow(workflow).await?;
        for route in routes {
            self.storage.register_webhook(route).await?;
        }
        self.reload_workflow(workflow.id).await
    }

    pub fn remove_workflow(&self, workflow_id: i64) {
        self.snapshot.rcu(|current| {
            let mut next = (**current).clone();
            next.workflows.remove(&workflow_id);
            next.routes.retain(|_, id| *id != workflow_id);
            next
        });
        tracing::info!("🗑️ Removed workflow from registry: {}", workflow_id);
    }

    /// Resolve a trigger to its workflow (lock-free read)
    pub fn find_by_webhook(&self, webhook_id: &str, method: &str) -> Option<CompiledWorkflow> {
        let snapshot = self.snapshot.load();
        let workflow_id = snapshot.routes.get(&route_key(webhook_id, method))?;
        snapshot.workflows.get(workflow_id).cloned()
    }

    pub fn workflow_count(&self) -> usize {
        self.snapshot.load().workflows.len()
    }
}

fn route_key(webhook_id: &str, method: &str) -> (String, String) {
    (webhook_id.to_string(), method.to_uppercase())
}

/// Build the `main`-port graph with petgraph and check it for cycles.
/// Edges to unknown node ids are ignored here; the walk skips them too.
fn main_graph_has_cycle(workflow: &Workflow) -> bool {
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let indices: HashMap<&str, NodeIndex> = workflow
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), graph.add_node(())))
        .collect();

    for (source, ports) in &workflow.connections {
        let Some(&from) = indices.get(source.as_str()) else {
            continue;
        };
        let Some(slots) = ports.get(MAIN_PORT) else {
            continue;
        };
        for targets in slots.iter().flatten() {
            for target in targets {
                if let Some(&to) = indices.get(target.node.as_str()) {
                    graph.add_edge(from, to, ());
                }
            }
        }
    }

    is_cyclic_directed(&graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow(id: i64, connections: serde_json::Value) -> Workflow {
        serde_json::from_value(json!({
            "id": id, "name": "wf", "status": "ACTIVE", "userId": "u1",
            "nodes": [
                {"id": "a", "name": "A", "type": "trigger", "parameters": {}, "webhookId": "hook-a"},
                {"id": "b", "name": "B", "type": "httpRequest", "parameters": {}},
                {"id": "c", "name": "C", "type": "httpRequest", "parameters": {}}
            ],
            "connections": connections
        }))
        .unwrap()
    }

    fn edge(to: &str) -> serde_json::Value {
        json!({"node": to, "type": "main", "index": 0})
    }

    #[test]
    fn detects_cycles_in_main_graph() {
        let acyclic = workflow(1, json!({"a": {"main": [[edge("b"), edge("c")]]}, "b": {"main": [[edge("c")]]}}));
        assert!(!CompiledWorkflow::compile(acyclic).has_cycle);

        let cyclic = workflow(2, json!({"a": {"main": [[edge("b")]]}, "b": {"main": [[edge("c")]]}, "c": {"main": [null, [edge("b")]]}}));
        assert!(CompiledWorkflow::compile(cyclic).has_cycle);
    }

    #[test]
    fn ignores_edges_to_unknown_nodes() {
        let dangling = workflow(3, json!({"a": {"main": [[edge("ghost")]]}, "ghost": {"main": [[edge("a")]]}}));
        assert!(!CompiledWorkflow::compile(dangling).has_cycle);
    }

    #[tokio::test]
    async fn routes_by_webhook_and_method_after_reload() {
        let storage = WorkflowStorage::new(crate::db::in_memory().await.unwrap());
        let registry = WorkflowRegistry::new(storage.clone());

        let wf = workflow(10, json!({}));
        let route = WebhookRoute {
            webhook_id: "hook-a".into(),
            method: "POST".into(),
            workflow_id: 10,
            node_id: "a".into(),
        };
        registry.publish(&wf, &[route]).await.unwrap();

        assert_eq!(registry.find_by_webhook("hook-a", "post").unwrap().workflow.id, 10);
        assert!(registry.find_by_webhook("hook-a", "GET").is_none());
        assert!(registry.find_by_webhook("other", "POST").is_none());

        storage.delete_workflow(10).await.unwrap();
        assert!(matches!(registry.reload_workflow(10).await, Err(EngineError::NotFound(_))));
        assert!(registry.find_by_webhook("hook-a", "POST").is_none());
        assert_eq!(registry.workflow_count(), 0);
    }

    #[tokio::test]
    async fn init_from_storage_loads_everything() {
        let storage = WorkflowStorage::new(crate::db::in_memory().await.unwrap());
        storage.save_workflow(&workflow(1, json!({}))).await.unwrap();
        storage.save_workflow(&workflow(2, json!({}))).await.unwrap();
        storage
            .register_webhook(&WebhookRoute {
                webhook_id: "hook-a".into(),
                method: "GET".into(),
                workflow_id: 2,
                node_id: "a".into(),
            })
            .await
            .unwrap();

        let registry = WorkflowRegistry::new(storage);
        registry.init_from_storage().await.unwrap();

        assert_eq!(registry.workflow_count(), 2);
        assert_eq!(registry.find_by_webhook("hook-a", "GET").unwrap().workflow.id, 2);
    }
}
