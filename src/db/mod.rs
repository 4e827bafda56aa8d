/// SQLite connection bootstrap and schema
///
/// One database holds the tables shared with the workflow authoring layer
/// (workflows, webhooks, credentials) and the execution records the engine owns.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Open (and create if missing) the database at `url`, then ensure the schema
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| anyhow::anyhow!("Invalid database url '{}': {}", url, e))?
        .create_if_missing(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create database directory '{}': {}", parent.display(), e))?;
        }
    }

    tracing::info!("🗄️ Opening database pool: {}", url);
    let pool = SqlitePool::connect_with(options).await?;
    init_schema(&pool).await?;
    tracing::info!("✅ Database ready: {}", url);

    Ok(pool)
}

/// Single-connection in-memory database, used by tests and local experiments
///
/// The pool never recycles its connection, otherwise the in-memory database
/// would vanish with it.
pub async fn in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes. Safe to call multiple times (uses IF NOT EXISTS).
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workflows (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'INACTIVE',
            definition JSON NOT NULL,
            trigger_count INTEGER NOT NULL DEFAULT 0,
            user_id TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // (webhook id, method) is the trigger routing key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhooks (
            id TEXT NOT NULL,
            method TEXT NOT NULL,
            workflow_id INTEGER NOT NULL,
            node_id TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (id, method)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Credential payloads are plain JSON here; encryption at rest belongs to the authoring layer
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credentials (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            data TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            workflow_id INTEGER NOT NULL,
            user_id TEXT NOT NULL,
            status TEXT NOT NULL,
            trigger_data JSON NOT NULL,
            node_executions JSON NOT NULL DEFAULT '[]',
            error TEXT,
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_webhooks_workflow ON webhooks(workflow_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_executions_workflow ON executions(workflow_id, started_at)")
        .execute(pool)
        .await?;

    Ok(())
}
