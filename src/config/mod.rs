/// Configuration management for the hookflow engine
///
/// Handles server binding, the SQLite database location, and node executor defaults.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Node executor defaults and third-party endpoints
    pub executors: ExecutorConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Database configuration shared with the workflow authoring layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL (default: "sqlite://data/hookflow.db")
    pub url: String,
}

/// Settings consumed by the built-in node executors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Request timeout for HTTP-call nodes that don't set their own `timeout`
    pub http_timeout_ms: u64,
    /// Base URL of the Resend email API
    pub resend_api_url: String,
    /// Base URL of the Telegram Bot API
    pub telegram_api_url: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            http_timeout_ms: 30_000,
            resend_api_url: "https://api.resend.com".to_string(),
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        let executor_defaults = ExecutorConfig::default();

        Self {
            server: ServerConfig {
                host: std::env::var("HOOKFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("HOOKFLOW_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                url: std::env::var("HOOKFLOW_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/hookflow.db".to_string()),
            },
            executors: ExecutorConfig {
                http_timeout_ms: std::env::var("HOOKFLOW_HTTP_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(executor_defaults.http_timeout_ms),
                resend_api_url: std::env::var("HOOKFLOW_RESEND_API_URL")
                    .unwrap_or(executor_defaults.resend_api_url),
                telegram_api_url: std::env::var("HOOKFLOW_TELEGRAM_API_URL")
                    .unwrap_or(executor_defaults.telegram_api_url),
            },
        }
    }
}
