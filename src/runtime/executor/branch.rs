/// Condition node: chooses the output slot the walk follows
///
/// `conditions` holds rule groups (evaluated raw, each rule resolving its own
/// expressions); `defaultOutput` applies when nothing matches. The upstream input
/// is passed through as `inputData` so downstream nodes still see it.

use crate::error::Result;
use crate::runtime::condition::ConditionEvaluator;
use crate::runtime::context::ExecutionContext;
use crate::workflow::Node;
use serde_json::{json, Value};

#[derive(Debug, Default)]
pub struct ConditionExecutor;

impl ConditionExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, node: &Node, ctx: &ExecutionContext, input: &Value) -> Result<Value> {
        let default_output = node
            .parameters
            .get("defaultOutput")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .unwrap_or(0);

        let groups = match node.parameters.get("conditions") {
            Some(Value::Array(groups)) if !groups.is_empty() => groups,
            _ => {
                tracing::debug!("🔀 {} has no conditions, using default output {}", node.name, default_output);
                return Ok(json!({
                    "selectedOutput": default_output,
                    "matched": false,
                    "inputData": input,
                }));
            }
        };

        let matched = ConditionEvaluator::new(ctx, input).first_match(groups);
        let selected = matched.unwrap_or(default_output);

        tracing::info!("🔀 Condition {} selected output {} (matched: {})", node.name, selected, matched.is_some());

        Ok(json!({
            "selectedOutput": selected,
            "matched": matched.is_some(),
            "inputData": input,
        }))
    }
}
