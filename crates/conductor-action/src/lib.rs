//! Action execution engine for Conductor.
//!
//! Takes actions proposed by a planner and carries them out against
//! built-in module handlers or runtime-registered executors, behind an
//! approval gate and with compensating rollback plans.

pub mod approval;
pub mod collaborator;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod rollback;
pub mod scheduling;
pub mod sweeper;
pub mod types;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use approval::{ApprovalGate, ApprovalStore, InMemoryApprovalStore};
pub use collaborator::{
    AuditLog, InMemoryAuditLog, InMemoryNotifier, Notification, Notifier, TracingAuditLog,
    TracingNotifier,
};
pub use dispatcher::{Dispatcher, DispatcherBuilder, REQUIRES_APPROVAL};
pub use error::ActionError;
pub use handler::{HandlerRegistry, ModuleHandler};
pub use registry::{
    ActionExecutor, ExecutorInfo, ExecutorRegistry, ExecutorType, ModuleExecutorRegistration,
};
pub use rollback::{InMemoryRollbackStore, RollbackStore};
pub use scheduling::{ScheduleService, ShiftAssignment, ShiftFilter, ShiftRequest};
pub use sweeper::ApprovalSweeper;
pub use types::{
    Action, ActionConfig, ActionResult, ApprovalDecision, ApprovalRequest, ApprovalResponse,
    ApprovalStatus, AuditRecord, ExecutionMetadata, ExecutionResult, Parameters, ResponseKind,
    RollbackPlan, RollbackStep, UserContext,
};
pub use webhook::{WebhookClient, WebhookConfig};
