/// Run-scoped execution state
///
/// Created by the engine for one trigger event and shared (behind an `Arc`) by every
/// branch of that run. Dropped when the run's detached task finishes.

use crate::execution::ExecutionStatus;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError, RwLock},
};

#[derive(Debug)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub workflow_id: i64,
    pub user_id: String,
    /// Original webhook payload
    pub trigger_data: Value,
    /// node id -> last recorded output
    node_outputs: RwLock<HashMap<String, Value>>,
    status: Mutex<ExecutionStatus>,
}

impl ExecutionContext {
    pub fn new(execution_id: String, workflow_id: i64, user_id: String, trigger_data: Value) -> Self {
        Self {
            execution_id,
            workflow_id,
            user_id,
            trigger_data,
            node_outputs: RwLock::new(HashMap::new()),
            status: Mutex::new(ExecutionStatus::Running),
        }
    }

    pub fn set_node_output(&self, node_id: &str, output: Value) {
        self.node_outputs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node_id.to_string(), output);
    }

    pub fn node_output(&self, node_id: &str) -> Option<Value> {
        self.node_outputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node_id)
            .cloned()
    }

    pub fn status(&self) -> ExecutionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: ExecutionStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}
