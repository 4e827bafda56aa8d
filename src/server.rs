/// Server setup and initialization
///
/// Wires together all components: database, workflow registry, credential and
/// execution stores, executor registry, execution engine, and HTTP routes.

use crate::{
    api::{create_api_router, AppState},
    config::{Config, ExecutorConfig},
    credentials::SqliteCredentialStore,
    db,
    execution::SqliteExecutionStore,
    runtime::{ExecutionEngine, ExecutorRegistry},
    workflow::{WorkflowRegistry, WorkflowStorage},
};
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "hookflow";

/// Create the main Axum application from configuration
pub async fn create_app(config: Config) -> Result<Router> {
    let pool = db::connect(&config.database.url).await?;
    create_app_with_pool(pool, config.executors).await
}

/// Build the application on an existing pool (schema must already exist)
///
/// Loads every stored workflow into the registry before the router is returned.
pub async fn create_app_with_pool(pool: SqlitePool, executor_config: ExecutorConfig) -> Result<Router> {
    tracing::info!("📊 Initializing workflow registry");
    let workflows = Arc::new(WorkflowRegistry::new(WorkflowStorage::new(pool.clone())));
    workflows
        .init_from_storage()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load workflows from storage: {}", e))?;

    tracing::info!("⚙️ Initializing executor registry");
    let credentials = Arc::new(SqliteCredentialStore::new(pool.clone()));
    let executors = Arc::new(ExecutorRegistry::new(credentials, executor_config));

    tracing::info!("🚀 Initializing execution engine");
    let executions = Arc::new(SqliteExecutionStore::new(pool));
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&workflows),
        executors,
        executions.clone(),
    ));

    let state = AppState {
        engine,
        executions,
        workflows,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(create_api_router(state));

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting {} server...", SERVICE_NAME);

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}
