//! Error types for the action engine.

use crate::types::ApprovalStatus;
use conductor_core::error::ConductorError;

/// Errors raised while registering, dispatching, or compensating actions.
///
/// Inside a batch every variant is converted into a failed
/// `ExecutionResult`; registration errors are returned to the caller of
/// `ExecutorRegistry::register` directly.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Invalid executor registration: {0}")]
    InvalidRegistration(String),
    #[error("No executor found for module: {0}")]
    ModuleNotFound(String),
    #[error("No executor registered for module: {0}")]
    ExecutorNotRegistered(String),
    #[error(
        "Operation '{operation}' is not supported by module '{module}'. Supported operations: {}",
        .supported.join(", ")
    )]
    UnsupportedOperation {
        module: String,
        operation: String,
        supported: Vec<String>,
    },
    #[error("Unknown {module} operation: {operation}")]
    UnknownOperation { module: String, operation: String },
    #[error("Invalid executor configuration for module: {0}")]
    InvalidConfiguration(String),
    #[error("Webhook executor timeout after {0}ms")]
    Timeout(u64),
    #[error("Webhook executor returned HTTP {0}")]
    WebhookStatus(u16),
    #[error("Webhook request failed: {0}")]
    Transport(String),
    #[error("Invalid response format from webhook executor: {0}")]
    InvalidResponse(String),
    #[error("Action handler failed: {0}")]
    HandlerFailed(String),
    #[error("Payload validation failed: {0}")]
    InvalidPayload(String),
    #[error("No rollback plan found for action: {0}")]
    RollbackPlanNotFound(String),
    #[error("Rollback failed: {0}")]
    Rollback(String),
    #[error("Rollback timeout of {0} minutes is out of range")]
    RollbackTimeoutOutOfRange(u64),
    #[error("Approval request not found: {0}")]
    ApprovalNotFound(String),
    #[error("Approval request {id} is {status}")]
    ApprovalClosed { id: String, status: ApprovalStatus },
    #[error("Approval request {0} has already been executed")]
    ApprovalAlreadyExecuted(String),
    #[error("Storage error: {0}")]
    Storage(#[from] ConductorError),
}

impl ActionError {
    /// True for webhook timeouts, which callers alert on separately from
    /// other transport failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ActionError::Timeout(_))
    }

    /// True for errors caused by a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ActionError::ModuleNotFound(_)
                | ActionError::ExecutorNotRegistered(_)
                | ActionError::RollbackPlanNotFound(_)
                | ActionError::ApprovalNotFound(_)
        )
    }
}
