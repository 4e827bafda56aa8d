#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Json;
use axum::routing::{any, post};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePool;

use hookflow::config::ExecutorConfig;
use hookflow::credentials::SqliteCredentialStore;
use hookflow::execution::{Execution, ExecutionStore, SqliteExecutionStore};
use hookflow::runtime::{ExecutionEngine, ExecutorRegistry};
use hookflow::workflow::{WebhookRoute, Workflow, WorkflowRegistry, WorkflowStorage};

pub const USER: &str = "user-1";
pub const RESEND_KEY: &str = "re_test";
pub const BOT_TOKEN: &str = "good-token";

/// Requests seen by the mock, as "METHOD /path"
pub type Hits = Arc<Mutex<Vec<String>>>;

/// Third-party endpoints bound to 127.0.0.1:0
pub struct MockServer {
    pub url: String,
    pub hits: Hits,
}

impl MockServer {
    pub fn hit_count(&self, entry: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|h| h.as_str() == entry).count()
    }
}

pub async fn spawn_mock() -> MockServer {
    let hits: Hits = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route("/ok", any(echo))
        .route("/fail", any(fail))
        .route("/slow", any(slow))
        .route("/emails", post(send_email))
        .route("/{bot}/sendMessage", post(send_message))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        url: format!("http://{}", addr),
        hits,
    }
}

fn record(hits: &Hits, method: &Method, path: &str) {
    hits.lock().unwrap().push(format!("{} {}", method, path));
}

async fn echo(State(hits): State<Hits>, method: Method, body: Bytes) -> Json<Value> {
    record(&hits, &method, "/ok");
    let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({"received": received, "method": method.as_str()}))
}

async fn fail(State(hits): State<Hits>, method: Method) -> (StatusCode, Json<Value>) {
    record(&hits, &method, "/fail");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"})))
}

async fn slow(State(hits): State<Hits>, method: Method) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    record(&hits, &method, "/slow");
    Json(json!({"slow": true}))
}

async fn send_email(
    State(hits): State<Hits>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&hits, &Method::POST, "/emails");
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", RESEND_KEY));

    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "API key is invalid"})));
    }
    if !body["to"].is_array() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"message": "to must be a list"})));
    }

    (StatusCode::OK, Json(json!({"id": "email-1"})))
}

async fn send_message(
    State(hits): State<Hits>,
    Path(bot): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&hits, &Method::POST, "/sendMessage");
    if bot != format!("bot{}", BOT_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "result": {
                "message_id": 7,
                "chat": {"id": body["chat_id"]},
                "text": body["text"],
                "date": 1_700_000_000
            }
        })),
    )
}

/// Engine plus every collaborator, all on one in-memory database
pub struct Harness {
    pub pool: SqlitePool,
    pub storage: WorkflowStorage,
    pub workflows: Arc<WorkflowRegistry>,
    pub credentials: Arc<SqliteCredentialStore>,
    pub executions: Arc<SqliteExecutionStore>,
    pub engine: ExecutionEngine,
}

pub fn executor_config(mock: &MockServer) -> ExecutorConfig {
    ExecutorConfig {
        http_timeout_ms: 5_000,
        resend_api_url: mock.url.clone(),
        telegram_api_url: mock.url.clone(),
    }
}

pub async fn harness(mock: &MockServer) -> Harness {
    let pool = hookflow::db::in_memory().await.unwrap();
    let storage = WorkflowStorage::new(pool.clone());
    let workflows = Arc::new(WorkflowRegistry::new(storage.clone()));
    let credentials = Arc::new(SqliteCredentialStore::new(pool.clone()));
    let executions = Arc::new(SqliteExecutionStore::new(pool.clone()));
    let executors = Arc::new(ExecutorRegistry::new(credentials.clone(), executor_config(mock)));
    let engine = ExecutionEngine::new(workflows.clone(), executors, executions.clone());

    Harness {
        pool,
        storage,
        workflows,
        credentials,
        executions,
        engine,
    }
}

impl Harness {
    /// Store the workflow and route POST `webhook_id` to it
    pub async fn publish(&self, workflow: &Workflow, webhook_id: &str) {
        let node_id = workflow
            .trigger_node(webhook_id)
            .map(|n| n.id.clone())
            .unwrap_or_else(|| "missing".to_string());
        let route = WebhookRoute {
            webhook_id: webhook_id.to_string(),
            method: "POST".to_string(),
            workflow_id: workflow.id,
            node_id,
        };
        self.workflows.publish(workflow, &[route]).await.unwrap();
    }

    pub async fn wait(&self, execution_id: &str) -> Execution {
        wait_for_completion(self.executions.as_ref(), execution_id).await
    }
}

/// Poll the store until the execution reaches a terminal status
pub async fn wait_for_completion(store: &dyn ExecutionStore, execution_id: &str) -> Execution {
    for _ in 0..200 {
        let execution = store.get(execution_id).await.unwrap();
        if execution.status.is_terminal() {
            return execution;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("execution {} did not finish in time", execution_id);
}

pub fn workflow(id: i64, status: &str, nodes: Value, connections: Value) -> Workflow {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("workflow-{}", id),
        "status": status,
        "userId": USER,
        "nodes": nodes,
        "connections": connections,
    }))
    .unwrap()
}

pub fn trigger(id: &str, webhook_id: &str) -> Value {
    json!({"id": id, "name": "Webhook", "type": "trigger", "parameters": {}, "webhookId": webhook_id})
}

pub fn http(id: &str, url: String) -> Value {
    json!({"id": id, "name": id, "type": "httpRequest", "parameters": {"url": url, "method": "GET"}})
}

pub fn edge(to: &str) -> Value {
    json!({"node": to, "type": "main", "index": 0})
}

/// `main` connections from `(source, [targets of slot 0])`
pub fn chain(pairs: &[(&str, &[&str])]) -> Value {
    let mut connections = serde_json::Map::new();
    for (source, targets) in pairs {
        let slot: Vec<Value> = targets.iter().map(|t| edge(t)).collect();
        connections.insert(source.to_string(), json!({"main": [slot]}));
    }
    Value::Object(connections)
}
