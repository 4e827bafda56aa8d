/// hookflow server entry point
///
/// Loads configuration from the environment and serves:
/// - Webhook triggers at /webhook/handler/{id}
/// - Execution lookup at /executions/*
/// - Workflow hot-reload at /api/workflows/{id}/reload
/// - Health check at /health

use hookflow::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
