/// Node execution handlers
///
/// One variant per supported node type:
/// - Trigger: hands the webhook payload to the rest of the graph
/// - HttpRequest: generic outbound HTTP call
/// - SendEmail: outbound email through Resend
/// - SendTelegram: outbound chat message through the Telegram Bot API
/// - Condition: picks which output slot the walk follows
///
/// Handlers return `Result<Value>` internally; `NodeExecutor::execute` folds any
/// error into a failed `NodeOutcome`, so a node failure never escapes as a panic or `Err`.

pub mod branch;
pub mod email;
pub mod http;
pub mod telegram;
pub mod trigger;

pub use branch::ConditionExecutor;
pub use email::EmailExecutor;
pub use http::HttpRequestExecutor;
pub use telegram::TelegramExecutor;
pub use trigger::TriggerExecutor;

use crate::credentials::CredentialStore;
use crate::error::{EngineError, Result};
use crate::runtime::context::ExecutionContext;
use crate::runtime::expression::{stringify, ExpressionResolver};
use crate::workflow::Node;
use serde_json::{Map, Value};

/// Result of executing a single node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub success: bool,
    /// `null` on failure
    pub output: Value,
    pub error: Option<String>,
}

impl NodeOutcome {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum NodeExecutor {
    Trigger(TriggerExecutor),
    HttpRequest(HttpRequestExecutor),
    SendEmail(EmailExecutor),
    SendTelegram(TelegramExecutor),
    Condition(ConditionExecutor),
}

impl NodeExecutor {
    /// Execute a single node against the run context and its upstream input
    pub async fn execute(&self, node: &Node, ctx: &ExecutionContext, input: &Value) -> NodeOutcome {
        tracing::info!("🚀 Starting node execution: {} ({}, type: {})", node.name, node.id, node.node_type);
        let start_time = std::time::Instant::now();

        let result = match self {
            NodeExecutor::Trigger(executor) => executor.execute(node, ctx),
            NodeExecutor::HttpRequest(executor) => executor.execute(node, ctx, input).await,
            NodeExecutor::SendEmail(executor) => executor.execute(node, ctx, input).await,
            NodeExecutor::SendTelegram(executor) => executor.execute(node, ctx, input).await,
            NodeExecutor::Condition(executor) => executor.execute(node, ctx, input),
        };

        let duration = start_time.elapsed();
        match result {
            Ok(output) => {
                tracing::info!("✅ Node execution completed: {} in {:?}", node.id, duration);
                NodeOutcome::success(output)
            }
            Err(e) => {
                tracing::error!("❌ Node execution failed: {} in {:?} - Error: {}", node.id, duration, e);
                NodeOutcome::failure(e)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NodeExecutor::Trigger(_) => "trigger",
            NodeExecutor::HttpRequest(_) => "httpRequest",
            NodeExecutor::SendEmail(_) => "sendEmail",
            NodeExecutor::SendTelegram(_) => "sendTelegram",
            NodeExecutor::Condition(_) => "condition",
        }
    }

    /// `main` slot the walk follows after this node produced `output`
    ///
    /// Only a condition result can pick a slot; every other type follows slot 0,
    /// whatever its output happens to contain.
    pub fn output_slot(&self, output: &Value) -> usize {
        match self {
            NodeExecutor::Condition(_) => output
                .get("selectedOutput")
                .and_then(Value::as_u64)
                .map_or(0, |slot| slot as usize),
            _ => 0,
        }
    }
}

/// Resolve every `{{...}}` in the node's parameters
pub(crate) fn resolve_parameters(node: &Node, ctx: &ExecutionContext, input: &Value) -> Map<String, Value> {
    ExpressionResolver::new(ctx, input).resolve_map(&node.parameters)
}

/// Fail when any of `required` is absent or `null` in the resolved parameters
pub(crate) fn require_params(node: &Node, params: &Map<String, Value>, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| params.get(*key).map_or(true, Value::is_null))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(EngineError::Validation(format!(
        "Missing required parameters for {}: {}",
        node.node_type,
        missing.join(", ")
    )))
}

/// Parameter as text; scalars are stringified, `null` and absent are `None`
pub(crate) fn param_text(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::Null => None,
        value => Some(stringify(value)),
    }
}

/// Treats `null`, `false`, `0` and `""` as unset
pub(crate) fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

/// A value or list of values, always as a list
pub(crate) fn as_list(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        other => Value::Array(vec![other.clone()]),
    }
}

/// Fetch the credential a node references under `credential_type`, scoped to the run's owner
pub(crate) async fn load_credentials(
    store: &dyn CredentialStore,
    node: &Node,
    ctx: &ExecutionContext,
    credential_type: &str,
    label: &str,
) -> Result<Value> {
    let raw_id = node
        .credential_id(credential_type)
        .ok_or_else(|| EngineError::Validation(format!("{} credentials not configured for this node", label)))?;

    let credential_id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| EngineError::Validation(format!("Invalid {} credential id: {}", label, raw_id)))?;

    tracing::debug!("🔐 Loading {} credential {} for user {}", credential_type, credential_id, ctx.user_id);
    store.get(credential_id, &ctx.user_id).await
}
