/// Core workflow type definitions
///
/// Defines workflows, nodes and the connection graph exactly as the authoring layer
/// stores them (camelCase JSON), so definitions round-trip without translation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Port walked by the execution engine
pub const MAIN_PORT: &str = "main";

/// Activation status of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStatus {
    Active,
    Inactive,
    Archived,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Active => "ACTIVE",
            WorkflowStatus::Inactive => "INACTIVE",
            WorkflowStatus::Archived => "ARCHIVED",
        }
    }
}

/// A complete workflow definition containing nodes and their connections
///
/// Read-only to the engine: the authoring layer creates and edits it, the
/// registry compiles it, the engine walks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    pub status: WorkflowStatus,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Connections,
    #[serde(default)]
    pub trigger_count: i64,
    pub user_id: String,
}

impl Workflow {
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// The node that receives the trigger for `webhook_id`
    pub fn trigger_node(&self, webhook_id: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.webhook_id.as_deref() == Some(webhook_id))
    }
}

/// A single node in the workflow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node identifier within the workflow
    pub id: String,
    /// Display name, used in logs and failure messages
    pub name: String,
    /// Type identifier resolved by the executor registry (e.g. "httpRequest")
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: f64,
    /// Canvas position, display only
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_fail: Option<bool>,
    // Retry policy is stored for the authoring layer; the engine does not retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on_fail: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_between_tries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_once: Option<bool>,
    /// Free-form parameters, may contain `{{...}}` expressions
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Named credential references: credential type -> reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<HashMap<String, CredentialRef>>,
    /// Only meaningful on trigger nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
}

fn default_type_version() -> f64 {
    1.0
}

impl Node {
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    pub fn continues_on_fail(&self) -> bool {
        self.continue_on_fail.unwrap_or(false)
    }

    /// Credential id referenced under `credential_type`, if any
    pub fn credential_id(&self, credential_type: &str) -> Option<&str> {
        self.credentials
            .as_ref()?
            .get(credential_type)?
            .id
            .as_deref()
    }
}

/// Reference to a stored credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRef {
    pub id: Option<String>,
    pub name: String,
}

/// One edge target inside an output slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Target node id
    pub node: String,
    /// Input port type on the target (e.g. "main")
    #[serde(rename = "type")]
    pub port_type: String,
    /// Input index on the target
    pub index: u32,
}

/// Output slots of one port; a slot may be null when nothing is attached
pub type OutputSlots = Vec<Option<Vec<Connection>>>;

/// Connection graph: source node id -> port name -> output slots
pub type Connections = HashMap<String, HashMap<String, OutputSlots>>;

/// Targets attached to `slot` of the `main` port of `source`
pub fn main_targets<'a>(connections: &'a Connections, source: &str, slot: usize) -> &'a [Connection] {
    connections
        .get(source)
        .and_then(|ports| ports.get(MAIN_PORT))
        .and_then(|slots| slots.get(slot))
        .and_then(|targets| targets.as_deref())
        .unwrap_or(&[])
}
