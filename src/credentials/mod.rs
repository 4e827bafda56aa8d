/// Credential collaborator
///
/// Message executors fetch third-party secrets through `CredentialStore`, always
/// scoped to the user who owns the running workflow.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, Row};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Decrypted payload of `credential_id`.
    /// `NotFound` when absent, `Unauthorized` when owned by someone other than `user_id`.
    async fn get(&self, credential_id: i64, user_id: &str) -> Result<Value>;
}

/// Credentials table shared with the authoring layer
///
/// Payloads are stored as plain JSON; encryption at rest is the authoring layer's concern.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a credential and return its id
    pub async fn insert(&self, kind: &str, data: &Value, user_id: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO credentials (kind, data, user_id) VALUES (?, ?, ?)")
            .bind(kind)
            .bind(serde_json::to_string(data)?)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self, credential_id: i64, user_id: &str) -> Result<Value> {
        let row = sqlx::query("SELECT data, user_id FROM credentials WHERE id = ?")
            .bind(credential_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Credential not found: {}", credential_id)))?;

        let owner: String = row.get("user_id");
        if owner != user_id {
            tracing::warn!("🚫 Credential {} requested by non-owner {}", credential_id, user_id);
            return Err(EngineError::Unauthorized("Unauthorized access to credential".to_string()));
        }

        let data: String = row.get("data");
        serde_json::from_str(&data)
            .map_err(|e| EngineError::Internal(format!("Failed to decode credential data: {}", e)))
    }
}
