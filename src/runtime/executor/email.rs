/// Email node backed by the Resend API
///
/// Requires `to`, `subject`, `body`; optional `from`, `html`, `replyTo`, `cc`, `bcc`.
/// The node must reference a `resend` credential holding `apiKey` (and optionally `defaultFrom`).

use crate::credentials::CredentialStore;
use crate::error::{EngineError, Result};
use crate::runtime::context::ExecutionContext;
use crate::runtime::executor::{as_list, is_set, load_credentials, param_text, require_params, resolve_parameters};
use crate::workflow::Node;
use serde_json::{json, Value};
use std::{fmt, sync::Arc};

const FALLBACK_SENDER: &str = "noreply@example.com";

pub struct EmailExecutor {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    api_url: String,
}

impl fmt::Debug for EmailExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailExecutor")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl EmailExecutor {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>, api_url: String) -> Self {
        Self {
            client,
            credentials,
            api_url,
        }
    }

    pub async fn execute(&self, node: &Node, ctx: &ExecutionContext, input: &Value) -> Result<Value> {
        let params = resolve_parameters(node, ctx, input);
        require_params(node, &params, &["to", "subject", "body"])?;

        let credentials = load_credentials(self.credentials.as_ref(), node, ctx, "resend", "Resend").await?;
        let api_key = credentials
            .get("apiKey")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EngineError::Validation("Resend API key not found in credentials".to_string()))?;

        let from = param_text(&params, "from")
            .filter(|from| !from.is_empty())
            .or_else(|| credentials.get("defaultFrom").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_SENDER.to_string());
        let to = as_list(&params["to"]);
        let subject = params["subject"].clone();

        let mut payload = json!({
            "from": from,
            "to": to,
            "subject": subject,
        });
        if is_set(params.get("html")) {
            payload["html"] = params["html"].clone();
        } else {
            payload["text"] = params["body"].clone();
        }
        if is_set(params.get("replyTo")) {
            payload["reply_to"] = params["replyTo"].clone();
        }
        for key in ["cc", "bcc"] {
            if is_set(params.get(key)) {
                payload[key] = as_list(&params[key]);
            }
        }

        tracing::info!("📧 Sending email via Resend to {}", to);

        let response = self
            .client
            .post(format!("{}/emails", self.api_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let data: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Email sending failed with status {}", status.as_u16()));
            if !node.continues_on_fail() {
                return Err(EngineError::Remote(message));
            }
            tracing::warn!("⚠️ {} (continuing, node {} has continueOnFail)", message, node.name);
        }

        let id = data.get("id").cloned().unwrap_or(Value::Null);
        tracing::info!("✅ Email sent, id: {}", id);

        Ok(json!({
            "id": id,
            "to": payload["to"],
            "from": payload["from"],
            "subject": payload["subject"],
            "status": "sent",
        }))
    }
}
