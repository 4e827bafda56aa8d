/// Trigger node: entry point of every run
///
/// Emits the webhook payload unchanged. `expectedKeys` is advisory only.

use crate::error::Result;
use crate::runtime::context::ExecutionContext;
use crate::workflow::Node;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct TriggerExecutor;

impl TriggerExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, node: &Node, ctx: &ExecutionContext) -> Result<Value> {
        let trigger_data = &ctx.trigger_data;

        if let Some(Value::Array(expected)) = node.parameters.get("expectedKeys") {
            let missing: Vec<&str> = expected
                .iter()
                .filter_map(Value::as_str)
                .filter(|key| trigger_data.get(*key).is_none())
                .collect();

            if !missing.is_empty() {
                tracing::warn!(
                    "⚠️ Trigger {} is missing expected keys in payload: {}",
                    node.name,
                    missing.join(", ")
                );
            }
        }

        tracing::debug!("📥 Trigger payload for {}: {}", node.id, trigger_data);

        Ok(trigger_data.clone())
    }
}
