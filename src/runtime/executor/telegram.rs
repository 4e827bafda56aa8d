/// Telegram node: `sendMessage` through the Bot API
///
/// Requires `chatId`, `text`; optional `parseMode`, `disableWebPagePreview`,
/// `disableNotification`, `replyToMessageId`. Bot token comes from a `telegram` credential.

use crate::credentials::CredentialStore;
use crate::error::{EngineError, Result};
use crate::runtime::context::ExecutionContext;
use crate::runtime::executor::{is_set, load_credentials, require_params, resolve_parameters};
use crate::runtime::expression::lookup_path;
use crate::workflow::Node;
use serde_json::{json, Value};
use std::{fmt, sync::Arc};

pub struct TelegramExecutor {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    api_url: String,
}

impl fmt::Debug for TelegramExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramExecutor")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TelegramExecutor {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>, api_url: String) -> Self {
        Self {
            client,
            credentials,
            api_url,
        }
    }

    pub async fn execute(&self, node: &Node, ctx: &ExecutionContext, input: &Value) -> Result<Value> {
        let params = resolve_parameters(node, ctx, input);
        require_params(node, &params, &["chatId", "text"])?;

        let credentials = load_credentials(self.credentials.as_ref(), node, ctx, "telegram", "Telegram").await?;
        let bot_token = credentials
            .get("botToken")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| EngineError::Validation("Telegram bot token not found in credentials".to_string()))?;

        let mut payload = json!({
            "chat_id": params["chatId"],
            "text": params["text"],
        });
        if is_set(params.get("parseMode")) {
            payload["parse_mode"] = params["parseMode"].clone();
        }
        for (param, field) in [
            ("disableWebPagePreview", "disable_web_page_preview"),
            ("disableNotification", "disable_notification"),
        ] {
            if let Some(value) = params.get(param).filter(|v| !v.is_null()) {
                payload[field] = value.clone();
            }
        }
        if is_set(params.get("replyToMessageId")) {
            payload["reply_to_message_id"] = params["replyToMessageId"].clone();
        }

        tracing::info!("💬 Sending Telegram message to chat {}", params["chatId"]);

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_url.trim_end_matches('/'), bot_token))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let data: Value = response.json().await.unwrap_or(Value::Null);

        let accepted = data.get("ok").and_then(Value::as_bool) == Some(true);
        if !status.is_success() || !accepted {
            let message = data
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Telegram message sending failed with status {}", status.as_u16()));
            if !node.continues_on_fail() {
                return Err(EngineError::Remote(message));
            }
            tracing::warn!("⚠️ {} (continuing, node {} has continueOnFail)", message, node.name);
        }

        let field = |path: &str| lookup_path(&data, path).unwrap_or(Value::Null);
        Ok(json!({
            "messageId": field("result.message_id"),
            "chatId": field("result.chat.id"),
            "text": field("result.text"),
            "date": field("result.date"),
            "status": "sent",
        }))
    }
}
