//! Runtime catalog of third-party executors.
//!
//! Modules installed after startup register here, either as an in-process
//! [`ActionExecutor`] or as a webhook endpoint. There is exactly one entry
//! per module id; a later registration replaces an earlier one.
//!
//! `unregister` does not wait for in-flight calls. `execute` clones the
//! entry out under the read lock, so a call that already resolved its
//! entry finishes against that snapshot and later calls see
//! [`ActionError::ExecutorNotRegistered`].

use async_trait::async_trait;
use conductor_core::error::ConductorError;
use conductor_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ActionError;
use crate::types::{Action, ExecutionResult, UserContext};
use crate::webhook::{WebhookClient, WebhookConfig};

/// An executor callable directly inside the host process.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(
        &self,
        action: &Action,
        ctx: &UserContext,
    ) -> Result<ExecutionResult, ActionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorType {
    InProcess,
    Webhook,
}

impl fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorType::InProcess => write!(f, "in-process"),
            ExecutorType::Webhook => write!(f, "webhook"),
        }
    }
}

/// Registration request for one module.
#[derive(Clone)]
pub struct ModuleExecutorRegistration {
    pub module_id: String,
    pub supported_operations: Vec<String>,
    pub executor_type: ExecutorType,
    pub executor: Option<Arc<dyn ActionExecutor>>,
    pub webhook_config: Option<WebhookConfig>,
}

impl ModuleExecutorRegistration {
    pub fn in_process(
        module_id: impl Into<String>,
        supported_operations: Vec<String>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            supported_operations,
            executor_type: ExecutorType::InProcess,
            executor: Some(executor),
            webhook_config: None,
        }
    }

    pub fn webhook(
        module_id: impl Into<String>,
        supported_operations: Vec<String>,
        config: WebhookConfig,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            supported_operations,
            executor_type: ExecutorType::Webhook,
            executor: None,
            webhook_config: Some(config),
        }
    }
}

/// Serializable view of a registry entry. API keys are never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorInfo {
    pub module_id: String,
    pub supported_operations: Vec<String>,
    pub executor_type: ExecutorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_url: Option<String>,
    pub registered_at: Timestamp,
}

#[derive(Clone)]
struct RegisteredExecutor {
    supported_operations: BTreeSet<String>,
    executor_type: ExecutorType,
    executor: Option<Arc<dyn ActionExecutor>>,
    webhook_config: Option<WebhookConfig>,
    registered_at: Timestamp,
}

impl RegisteredExecutor {
    fn info(&self, module_id: &str) -> ExecutorInfo {
        ExecutorInfo {
            module_id: module_id.to_string(),
            supported_operations: self.supported_operations.iter().cloned().collect(),
            executor_type: self.executor_type,
            executor_url: self
                .webhook_config
                .as_ref()
                .map(|c| c.executor_url.clone()),
            registered_at: self.registered_at,
        }
    }
}

pub struct ExecutorRegistry {
    entries: RwLock<HashMap<String, RegisteredExecutor>>,
    webhook: WebhookClient,
}

impl ExecutorRegistry {
    pub fn new(webhook: WebhookClient) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            webhook,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, RegisteredExecutor>>, ActionError> {
        self.entries
            .read()
            .map_err(|_| ConductorError::lock_poisoned("executor registry").into())
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, RegisteredExecutor>>, ActionError> {
        self.entries
            .write()
            .map_err(|_| ConductorError::lock_poisoned("executor registry").into())
    }

    /// Validate and store a registration, replacing any entry for the same
    /// module id.
    pub fn register(&self, registration: ModuleExecutorRegistration) -> Result<(), ActionError> {
        if registration.module_id.trim().is_empty() {
            return Err(ActionError::InvalidRegistration(
                "Module ID is required".to_string(),
            ));
        }
        if registration.supported_operations.is_empty() {
            return Err(ActionError::InvalidRegistration(
                "At least one supported operation is required".to_string(),
            ));
        }
        match registration.executor_type {
            ExecutorType::InProcess if registration.executor.is_none() => {
                return Err(ActionError::InvalidRegistration(
                    "In-process executors require an executor function".to_string(),
                ));
            }
            ExecutorType::Webhook
                if registration
                    .webhook_config
                    .as_ref()
                    .map_or(true, |c| c.executor_url.trim().is_empty()) =>
            {
                return Err(ActionError::InvalidRegistration(
                    "Webhook executors require an executorUrl".to_string(),
                ));
            }
            _ => {}
        }

        let entry = RegisteredExecutor {
            supported_operations: registration.supported_operations.into_iter().collect(),
            executor_type: registration.executor_type,
            executor: registration.executor,
            webhook_config: registration.webhook_config,
            registered_at: Timestamp::now(),
        };
        let replaced = self
            .write()?
            .insert(registration.module_id.clone(), entry)
            .is_some();

        tracing::info!(
            module = %registration.module_id,
            executor_type = %registration.executor_type,
            replaced,
            "Executor registered"
        );
        Ok(())
    }

    /// Remove a module's entry. Returns `true` if one existed.
    pub fn unregister(&self, module_id: &str) -> Result<bool, ActionError> {
        let removed = self.write()?.remove(module_id).is_some();
        if removed {
            tracing::info!(module = %module_id, "Executor unregistered");
        }
        Ok(removed)
    }

    pub fn has(&self, module_id: &str) -> Result<bool, ActionError> {
        Ok(self.read()?.contains_key(module_id))
    }

    pub fn supports_operation(&self, module_id: &str, operation: &str) -> Result<bool, ActionError> {
        Ok(self
            .read()?
            .get(module_id)
            .is_some_and(|e| e.supported_operations.contains(operation)))
    }

    /// Registered module ids, sorted.
    pub fn list_modules(&self) -> Result<Vec<String>, ActionError> {
        let mut modules: Vec<String> = self.read()?.keys().cloned().collect();
        modules.sort();
        Ok(modules)
    }

    /// All entries, sorted by module id.
    pub fn get_all(&self) -> Result<Vec<ExecutorInfo>, ActionError> {
        let mut all: Vec<ExecutorInfo> = self
            .read()?
            .iter()
            .map(|(id, entry)| entry.info(id))
            .collect();
        all.sort_by(|a, b| a.module_id.cmp(&b.module_id));
        Ok(all)
    }

    pub fn clear(&self) -> Result<(), ActionError> {
        self.write()?.clear();
        Ok(())
    }

    /// Dispatch `action` to the executor registered for `action.module`.
    pub async fn execute(
        &self,
        action: &Action,
        ctx: &UserContext,
    ) -> Result<ExecutionResult, ActionError> {
        let entry = self
            .read()?
            .get(&action.module)
            .cloned()
            .ok_or_else(|| ActionError::ExecutorNotRegistered(action.module.clone()))?;

        if !entry.supported_operations.contains(&action.operation) {
            return Err(ActionError::UnsupportedOperation {
                module: action.module.clone(),
                operation: action.operation.clone(),
                supported: entry.supported_operations.into_iter().collect(),
            });
        }

        match (entry.executor_type, &entry.executor, &entry.webhook_config) {
            (ExecutorType::InProcess, Some(executor), _) => executor.execute(action, ctx).await,
            (ExecutorType::Webhook, _, Some(config)) => {
                self.webhook.execute(action, ctx, config).await
            }
            _ => Err(ActionError::InvalidConfiguration(action.module.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionMetadata, Parameters};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActionExecutor for CountingExecutor {
        async fn execute(
            &self,
            action: &Action,
            _ctx: &UserContext,
        ) -> Result<ExecutionResult, ActionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionResult {
                action_id: action.id.clone(),
                success: true,
                result: None,
                error: None,
                metadata: ExecutionMetadata {
                    execution_time_ms: 1,
                    module: action.module.clone(),
                    operation: action.operation.clone(),
                    affected_users: vec![],
                    rollback_available: false,
                },
            })
        }
    }

    fn registry() -> ExecutorRegistry {
        ExecutorRegistry::new(WebhookClient::new(1_000))
    }

    fn ops(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn action(module: &str, operation: &str) -> Action {
        Action {
            id: "a1".to_string(),
            action_type: String::new(),
            module: module.to_string(),
            operation: operation.to_string(),
            parameters: Parameters::new(),
            requires_approval: false,
            affected_users: vec![],
            reasoning: String::new(),
        }
    }

    fn counting() -> Arc<CountingExecutor> {
        Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_register_requires_operations() {
        let err = registry()
            .register(ModuleExecutorRegistration::in_process("x", vec![], counting()))
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidRegistration(_)));
        assert!(err
            .to_string()
            .contains("At least one supported operation is required"));
    }

    #[test]
    fn test_register_requires_module_id() {
        let err = registry()
            .register(ModuleExecutorRegistration::in_process(" ", ops(&["a"]), counting()))
            .unwrap_err();
        assert!(err.to_string().contains("Module ID is required"));
    }

    #[test]
    fn test_in_process_requires_executor() {
        let mut reg = ModuleExecutorRegistration::in_process("x", ops(&["a"]), counting());
        reg.executor = None;
        assert!(matches!(
            registry().register(reg),
            Err(ActionError::InvalidRegistration(_))
        ));
    }

    #[test]
    fn test_webhook_requires_url() {
        let reg = ModuleExecutorRegistration::webhook(
            "x",
            ops(&["a"]),
            WebhookConfig {
                executor_url: String::new(),
                api_key: None,
                timeout_ms: None,
            },
        );
        assert!(matches!(
            registry().register(reg),
            Err(ActionError::InvalidRegistration(_))
        ));

        let mut reg = ModuleExecutorRegistration::webhook(
            "x",
            ops(&["a"]),
            WebhookConfig {
                executor_url: "http://localhost:1".to_string(),
                api_key: None,
                timeout_ms: None,
            },
        );
        reg.webhook_config = None;
        assert!(registry().register(reg).is_err());
    }

    #[test]
    fn test_lookups_and_admin() {
        let registry = registry();
        registry
            .register(ModuleExecutorRegistration::in_process(
                "crm",
                ops(&["create_lead", "close_lead"]),
                counting(),
            ))
            .unwrap();
        registry
            .register(ModuleExecutorRegistration::webhook(
                "billing",
                ops(&["refund"]),
                WebhookConfig {
                    executor_url: "http://billing.internal/exec".to_string(),
                    api_key: Some("secret".to_string()),
                    timeout_ms: None,
                },
            ))
            .unwrap();

        assert!(registry.has("crm").unwrap());
        assert!(registry.supports_operation("crm", "close_lead").unwrap());
        assert!(!registry.supports_operation("crm", "refund").unwrap());
        assert!(!registry.supports_operation("ghost", "refund").unwrap());
        assert_eq!(registry.list_modules().unwrap(), vec!["billing", "crm"]);

        let all = registry.get_all().unwrap();
        assert_eq!(all[0].executor_type, ExecutorType::Webhook);
        assert_eq!(
            all[0].executor_url.as_deref(),
            Some("http://billing.internal/exec")
        );
        let json = serde_json::to_value(&all[0]).unwrap();
        assert_eq!(json["executorType"], "webhook");
        assert!(json.get("apiKey").is_none());

        assert!(registry.unregister("crm").unwrap());
        assert!(!registry.unregister("crm").unwrap());
        registry.clear().unwrap();
        assert!(registry.list_modules().unwrap().is_empty());
    }

    #[test]
    fn test_later_registration_overwrites() {
        let registry = registry();
        registry
            .register(ModuleExecutorRegistration::in_process("crm", ops(&["a"]), counting()))
            .unwrap();
        registry
            .register(ModuleExecutorRegistration::in_process("crm", ops(&["b"]), counting()))
            .unwrap();
        assert_eq!(registry.get_all().unwrap().len(), 1);
        assert!(!registry.supports_operation("crm", "a").unwrap());
        assert!(registry.supports_operation("crm", "b").unwrap());
    }

    #[tokio::test]
    async fn test_execute_unregistered_module() {
        let err = registry()
            .execute(&action("ghost", "x"), &UserContext::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::ExecutorNotRegistered(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_execute_unsupported_operation_lists_supported() {
        let registry = registry();
        let executor = counting();
        registry
            .register(ModuleExecutorRegistration::in_process(
                "crm",
                ops(&["create_lead", "close_lead"]),
                executor.clone(),
            ))
            .unwrap();

        let err = registry
            .execute(&action("crm", "delete_everything"), &UserContext::new("u1"))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("close_lead, create_lead"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_in_process() {
        let registry = registry();
        let executor = counting();
        registry
            .register(ModuleExecutorRegistration::in_process(
                "crm",
                ops(&["create_lead"]),
                executor.clone(),
            ))
            .unwrap();

        let result = registry
            .execute(&action("crm", "create_lead"), &UserContext::new("u1"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    fn webhook_registration(
        module: &str,
        url: String,
        timeout_ms: Option<u64>,
    ) -> ModuleExecutorRegistration {
        ModuleExecutorRegistration::webhook(
            module,
            ops(&["create_lead"]),
            WebhookConfig {
                executor_url: url,
                api_key: None,
                timeout_ms,
            },
        )
    }

    #[tokio::test]
    async fn test_execute_registered_webhook() {
        let base = crate::test_support::spawn_webhook_executor().await;
        let registry = registry();
        registry
            .register(webhook_registration("crm", format!("{}/echo", base), None))
            .unwrap();

        let result = registry
            .execute(&action("crm", "create_lead"), &UserContext::new("u7"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.action_id, "a1");
        let output = result.result.unwrap();
        assert_eq!(output["operation"], "create_lead");
        assert_eq!(output["userId"], "u7");
    }

    #[tokio::test]
    async fn test_registered_webhook_times_out_at_configured_limit() {
        let base = crate::test_support::spawn_webhook_executor().await;
        let registry = ExecutorRegistry::new(WebhookClient::new(30_000));
        registry
            .register(webhook_registration("x", format!("{}/slow", base), Some(1_000)))
            .unwrap();

        let start = std::time::Instant::now();
        let err = registry
            .execute(&action("x", "create_lead"), &UserContext::new("u1"))
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Webhook executor timeout after 1000ms");
        assert!(elapsed >= std::time::Duration::from_millis(1_000));
        assert!(elapsed < std::time::Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn test_registered_webhook_malformed_body() {
        let base = crate::test_support::spawn_webhook_executor().await;
        let registry = registry();
        registry
            .register(webhook_registration("crm", format!("{}/garbage", base), None))
            .unwrap();

        let err = registry
            .execute(&action("crm", "create_lead"), &UserContext::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidResponse(_)));
    }
}
