//! Module handler trait and the registry of built-in modules.
//!
//! Each first-party module implements [`ModuleHandler`] once. The dispatcher
//! looks modules up by id in a [`HandlerRegistry`]; adding a module means
//! registering another implementation.

pub mod business;
pub mod calendar;
pub mod chat;
pub mod dashboard;
pub mod drive;
pub mod household;
pub mod notifications;
pub mod scheduling;
pub mod tasks;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ActionError;
use crate::scheduling::ScheduleService;
use crate::types::{Action, ActionResult, Parameters, RollbackStep, UserContext};

/// Capability interface implemented by every built-in module.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    /// Module id used in `Action::module`.
    fn module_id(&self) -> &str;

    /// Operation names this module accepts.
    fn operations(&self) -> &[&str];

    /// Run one operation. Unrecognized operations fail with
    /// [`ActionError::UnknownOperation`].
    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError>;

    /// Compensating steps that undo `action`. Irreversible operations
    /// return no steps.
    fn rollback_steps(&self, _action: &Action) -> Vec<RollbackStep> {
        Vec::new()
    }

    /// Human-readable summary used in approval notifications.
    fn describe(&self, operation: &str, _parameters: &Parameters) -> String {
        format!("{} {}", self.module_id(), operation.replace('_', " "))
    }

    fn supports(&self, operation: &str) -> bool {
        self.operations().contains(&operation)
    }
}

/// Lookup table from module id to handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ModuleHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous handler for the same module.
    pub fn register(&mut self, handler: Arc<dyn ModuleHandler>) {
        self.handlers.insert(handler.module_id().to_string(), handler);
    }

    /// Install the nine first-party modules.
    pub fn register_defaults(&mut self, schedule: Arc<ScheduleService>) {
        self.register(Arc::new(drive::DriveHandler));
        self.register(Arc::new(chat::ChatHandler));
        self.register(Arc::new(household::HouseholdHandler));
        self.register(Arc::new(business::BusinessHandler));
        self.register(Arc::new(dashboard::DashboardHandler));
        self.register(Arc::new(calendar::CalendarHandler));
        self.register(Arc::new(tasks::TasksHandler));
        self.register(Arc::new(notifications::NotificationsHandler));
        self.register(Arc::new(scheduling::SchedulingHandler::new(schedule)));
    }

    pub fn get(&self, module: &str) -> Option<Arc<dyn ModuleHandler>> {
        self.handlers.get(module).cloned()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.handlers.contains_key(module)
    }

    /// Registered module ids, sorted.
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.handlers.keys().cloned().collect();
        modules.sort();
        modules
    }
}

// -----------------------------------------------------------------------------
// Parameter helpers shared by the built-in handlers
// -----------------------------------------------------------------------------

/// Fetch a required, non-empty string parameter.
pub(crate) fn required_str<'a>(params: &'a Parameters, key: &str) -> Result<&'a str, ActionError> {
    match params.get(key).and_then(|v| v.as_str()) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ActionError::InvalidPayload(format!(
            "'{}' must be a non-empty string",
            key
        ))),
    }
}

pub(crate) fn optional_str<'a>(params: &'a Parameters, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

pub(crate) fn unknown_operation(module: &str, operation: &str) -> ActionError {
    ActionError::UnknownOperation {
        module: module.to_string(),
        operation: operation.to_string(),
    }
}

/// Build a rollback step from `(key, value)` parameter pairs.
pub(crate) fn step(
    module: &str,
    operation: &str,
    order: i32,
    params: &[(&str, serde_json::Value)],
) -> RollbackStep {
    RollbackStep {
        module: module.to_string(),
        operation: operation.to_string(),
        parameters: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        order,
    }
}

#[cfg(test)]
pub(crate) fn params(value: serde_json::Value) -> Parameters {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Parameters::new(),
    }
}
