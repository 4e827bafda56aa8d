/// HTTP request node
///
/// Parameters (after expression resolution):
/// - `url`, `method` (required)
/// - `headers`: object merged over `Content-Type: application/json`
/// - `body`: sent for POST/PUT/PATCH; strings verbatim, anything else as JSON
/// - `timeout`: milliseconds, falls back to the configured default
/// - `authentication`: `{type: basic, username, password}`, `{type: bearer, token}`
///   or `{type: header, name, value}`
///
/// Output: `{statusCode, statusMessage, headers, body}`.

use crate::error::{EngineError, Result};
use crate::runtime::context::ExecutionContext;
use crate::runtime::executor::{is_set, param_text, require_params, resolve_parameters};
use crate::runtime::expression::stringify;
use crate::workflow::Node;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpRequestExecutor {
    client: reqwest::Client,
    default_timeout_ms: u64,
}

impl HttpRequestExecutor {
    pub fn new(client: reqwest::Client, default_timeout_ms: u64) -> Self {
        Self {
            client,
            default_timeout_ms,
        }
    }

    pub async fn execute(&self, node: &Node, ctx: &ExecutionContext, input: &Value) -> Result<Value> {
        let params = resolve_parameters(node, ctx, input);
        require_params(node, &params, &["url", "method"])?;

        let url = param_text(&params, "url").unwrap_or_default();
        let method_name = param_text(&params, "method")
            .unwrap_or_else(|| "GET".to_string())
            .to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| EngineError::Validation(format!("Unsupported HTTP method: {}", method_name)))?;
        let timeout_ms = params
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(self.default_timeout_ms);

        tracing::debug!("🌍 HTTP Request: {} {} (timeout {}ms)", method, url, timeout_ms);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(Value::Object(custom)) = params.get("headers") {
            for (name, value) in custom {
                insert_header(&mut headers, name, &stringify(value))?;
            }
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .timeout(Duration::from_millis(timeout_ms));

        if let Some(Value::Object(auth)) = params.get("authentication") {
            request = apply_authentication(request, &mut headers, auth)?;
        }

        request = request.headers(headers);

        if matches!(method, Method::POST | Method::PUT | Method::PATCH) && is_set(params.get("body")) {
            request = match params.get("body") {
                Some(Value::String(raw)) => request.body(raw.clone()),
                Some(body) => request.body(serde_json::to_vec(body)?),
                None => request,
            };
        }

        let response = request.send().await?;
        let status = response.status();

        let mut response_headers = Map::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else { continue };
            match response_headers.get_mut(name.as_str()) {
                Some(Value::String(existing)) => {
                    existing.push_str(", ");
                    existing.push_str(value);
                }
                _ => {
                    response_headers.insert(name.as_str().to_string(), Value::String(value.to_string()));
                }
            }
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let text = response.text().await?;
        let body = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        tracing::debug!("📡 Response status: {} for {} {}", status, method, url);

        if !status.is_success() {
            let message = format!("HTTP request failed with status {}", status.as_u16());
            if !node.continues_on_fail() {
                return Err(EngineError::Remote(message));
            }
            tracing::warn!("⚠️ {} (continuing, node {} has continueOnFail)", message, node.name);
        }

        Ok(json!({
            "statusCode": status.as_u16(),
            "statusMessage": status.canonical_reason().unwrap_or(""),
            "headers": response_headers,
            "body": body,
        }))
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| EngineError::Validation(format!("Invalid header name: {}", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| EngineError::Validation(format!("Invalid value for header {}", name)))?;
    headers.insert(name, value);
    Ok(())
}

fn apply_authentication(
    request: RequestBuilder,
    headers: &mut HeaderMap,
    auth: &Map<String, Value>,
) -> Result<RequestBuilder> {
    let field = |key: &str| param_text(auth, key).unwrap_or_default();

    match auth.get("type").and_then(Value::as_str) {
        Some("basic") => Ok(request.basic_auth(field("username"), Some(field("password")))),
        Some("bearer") => Ok(request.bearer_auth(field("token"))),
        Some("header") => {
            insert_header(headers, &field("name"), &field("value"))?;
            Ok(request)
        }
        other => {
            tracing::warn!("⚠️ Ignoring unknown authentication type: {:?}", other);
            Ok(request)
        }
    }
}
