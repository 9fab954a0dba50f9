//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_action::{
    ActionConfig, Dispatcher, ExecutorRegistry, HandlerRegistry, ModuleExecutorRegistration,
    ScheduleService, WebhookClient, WebhookConfig,
};
use conductor_core::config::{ConductorConfig, WebhookExecutorConfig};

/// Shared application state.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConductorConfig>,
    pub dispatcher: Arc<Dispatcher>,
    /// Shift roster, shared with the `scheduling` module handler.
    pub schedule: Arc<ScheduleService>,
    pub api_token: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: ConductorConfig,
        dispatcher: Arc<Dispatcher>,
        schedule: Arc<ScheduleService>,
        api_token: String,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            schedule,
            api_token,
            start_time: Instant::now(),
        }
    }

    /// State with the nine built-in modules, an empty executor registry,
    /// and in-memory stores.
    pub fn in_memory(config: ConductorConfig, api_token: String) -> Self {
        let schedule = Arc::new(ScheduleService::new());
        let mut handlers = HandlerRegistry::new();
        handlers.register_defaults(Arc::clone(&schedule));

        let engine = ActionConfig::from(&config.engine);
        let executors = Arc::new(ExecutorRegistry::new(WebhookClient::from(&engine)));
        let dispatcher = Dispatcher::builder(handlers, executors, engine).build();

        Self::new(config, Arc::new(dispatcher), schedule, api_token)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// True when `module_id` is served by a built-in handler, which always
    /// takes precedence over a registered executor.
    pub fn is_builtin_module(&self, module_id: &str) -> bool {
        self.dispatcher.handlers().contains(module_id)
    }

    /// Register the `[[executors]]` entries from the config file.
    ///
    /// Entries naming a built-in module or failing validation are logged and
    /// skipped. Returns the number registered.
    pub fn register_webhook_executors(&self, entries: &[WebhookExecutorConfig]) -> usize {
        let registry = self.dispatcher.executors();
        let mut registered = 0;
        for entry in entries {
            if self.is_builtin_module(&entry.module_id) {
                tracing::error!(
                    module = %entry.module_id,
                    "Skipping configured executor: module is built in"
                );
                continue;
            }
            let registration = ModuleExecutorRegistration::webhook(
                entry.module_id.clone(),
                entry.supported_operations.clone(),
                WebhookConfig {
                    executor_url: entry.executor_url.clone(),
                    api_key: entry.api_key.clone(),
                    timeout_ms: entry.timeout_ms,
                },
            );
            match registry.register(registration) {
                Ok(()) => registered += 1,
                Err(e) => tracing::error!(
                    module = %entry.module_id,
                    error = %e,
                    "Skipping configured executor"
                ),
            }
        }
        registered
    }
}
