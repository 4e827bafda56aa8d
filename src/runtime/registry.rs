/// Node executor registry
///
/// Maps node type ids to executor instances. Executors are created lazily, one per
/// type id, and cached in an `ArcSwap` map so lookups on the hot path never lock.
/// Built once at startup and handed to the engine by `Arc`.

use crate::config::ExecutorConfig;
use crate::credentials::CredentialStore;
use crate::error::{EngineError, Result};
use crate::runtime::executor::{
    ConditionExecutor, EmailExecutor, HttpRequestExecutor, NodeExecutor, TelegramExecutor, TriggerExecutor,
};
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Built-in type ids accepted by the factory
pub const BUILTIN_NODE_TYPES: &[&str] = &[
    "trigger",
    "webhook",
    "webhookTrigger",
    "httpRequest",
    "sendEmail",
    "sendTelegram",
    "condition",
];

pub struct ExecutorRegistry {
    cache: ArcSwap<HashMap<String, Arc<NodeExecutor>>>,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    config: ExecutorConfig,
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("cached", &self.cache.load().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExecutorRegistry {
    pub fn new(credentials: Arc<dyn CredentialStore>, config: ExecutorConfig) -> Self {
        Self::with_client(reqwest::Client::new(), credentials, config)
    }

    pub fn with_client(client: reqwest::Client, credentials: Arc<dyn CredentialStore>, config: ExecutorConfig) -> Self {
        Self {
            cache: ArcSwap::from_pointee(HashMap::new()),
            client,
            credentials,
            config,
        }
    }

    /// Executor for `node_type`, created on first use
    pub fn get_executor(&self, node_type: &str) -> Result<Arc<NodeExecutor>> {
        if let Some(executor) = self.cache.load().get(node_type) {
            return Ok(Arc::clone(executor));
        }

        let created = Arc::new(self.create_executor(node_type)?);
        tracing::debug!("🧩 Created executor for node type: {}", node_type);

        // A concurrent creator may have won the race; whichever entry is cached is returned.
        let mut resolved = Arc::clone(&created);
        self.cache.rcu(|current| {
            let mut next = HashMap::clone(current);
            resolved = Arc::clone(next.entry(node_type.to_string()).or_insert_with(|| Arc::clone(&created)));
            next
        });

        Ok(resolved)
    }

    /// Install (or replace) the executor used for `node_type`
    pub fn register_executor(&self, node_type: &str, executor: NodeExecutor) {
        let executor = Arc::new(executor);
        self.cache.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(node_type.to_string(), Arc::clone(&executor));
            next
        });
        tracing::info!("🧩 Registered executor for node type: {}", node_type);
    }

    /// Drop every cached executor; subsequent lookups recreate them
    pub fn clear_cache(&self) {
        self.cache.store(Arc::new(HashMap::new()));
        tracing::info!("🧹 Cleared executor cache");
    }

    pub fn cached_count(&self) -> usize {
        self.cache.load().len()
    }

    fn create_executor(&self, node_type: &str) -> Result<NodeExecutor> {
        let executor = match node_type {
            "trigger" | "webhook" | "webhookTrigger" => NodeExecutor::Trigger(TriggerExecutor::new()),
            "httpRequest" => NodeExecutor::HttpRequest(HttpRequestExecutor::new(
                self.client.clone(),
                self.config.http_timeout_ms,
            )),
            "sendEmail" => NodeExecutor::SendEmail(EmailExecutor::new(
                self.client.clone(),
                Arc::clone(&self.credentials),
                self.config.resend_api_url.clone(),
            )),
            "sendTelegram" => NodeExecutor::SendTelegram(TelegramExecutor::new(
                self.client.clone(),
                Arc::clone(&self.credentials),
                self.config.telegram_api_url.clone(),
            )),
            "condition" => NodeExecutor::Condition(ConditionExecutor::new()),
            other => return Err(EngineError::Unsupported(other.to_string())),
        };

        Ok(executor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct NoCredentials;

    #[async_trait::async_trait]
    impl CredentialStore for NoCredentials {
        async fn get(&self, credential_id: i64, _user_id: &str) -> Result<Value> {
            Err(EngineError::NotFound(format!("Credential not found: {}", credential_id)))
        }
    }

    fn registry() -> ExecutorRegistry {
        ExecutorRegistry::new(Arc::new(NoCredentials), ExecutorConfig::default())
    }

    #[test]
    fn builtin_types_resolve_with_aliases() {
        let registry = registry();
        for node_type in BUILTIN_NODE_TYPES {
            assert!(registry.get_executor(node_type).is_ok(), "{} should resolve", node_type);
        }

        assert_eq!(registry.get_executor("webhook").unwrap().kind(), "trigger");
        assert_eq!(registry.get_executor("webhookTrigger").unwrap().kind(), "trigger");
        assert_eq!(registry.get_executor("sendTelegram").unwrap().kind(), "sendTelegram");
    }

    #[test]
    fn one_instance_per_type_until_cleared() {
        let registry = registry();
        let first = registry.get_executor("httpRequest").unwrap();
        let second = registry.get_executor("httpRequest").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_count(), 1);

        registry.clear_cache();
        assert_eq!(registry.cached_count(), 0);
        let third = registry.get_executor("httpRequest").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = registry().get_executor("ftpUpload").unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
        assert_eq!(err.to_string(), "Unsupported node type: ftpUpload");
    }

    #[test]
    fn registered_executor_overrides_factory() {
        let registry = registry();
        registry.register_executor("httpRequest", NodeExecutor::Condition(ConditionExecutor::new()));
        assert_eq!(registry.get_executor("httpRequest").unwrap().kind(), "condition");

        registry.register_executor("customEcho", NodeExecutor::Trigger(TriggerExecutor::new()));
        assert_eq!(registry.get_executor("customEcho").unwrap().kind(), "trigger");
    }
}
