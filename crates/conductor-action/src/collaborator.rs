//! Contracts for the external collaborators the engine reports to.
//!
//! The audit trail and user notification delivery live outside the engine.
//! Each trait ships with an in-memory implementation for tests and embedding
//! and a `tracing`-backed one for deployments without a dedicated sink.

use async_trait::async_trait;
use conductor_core::error::ConductorError;
use std::sync::Mutex;

use crate::error::ActionError;
use crate::types::{ApprovalRequest, AuditRecord};

/// Append-only record of forward executions.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), ActionError>;
}

/// A message destined for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub body: String,
    /// Approval request the notification refers to, if any.
    pub approval_id: Option<String>,
}

impl Notification {
    /// Notification asking `user_id` to review `request`.
    pub fn approval_needed(user_id: &str, request: &ApprovalRequest, summary: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            title: "Approval needed".to_string(),
            body: format!("{} (requested by {})", summary, request.user_id),
            approval_id: Some(request.id.clone()),
        }
    }
}

/// Delivers notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), ActionError>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

#[derive(Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, in append order.
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(_) => vec![],
        }
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, record: AuditRecord) -> Result<(), ActionError> {
        self.records
            .lock()
            .map_err(|_| ConductorError::lock_poisoned("audit log"))?
            .push(record);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(_) => vec![],
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), ActionError> {
        self.sent
            .lock()
            .map_err(|_| ConductorError::lock_poisoned("notifications"))?
            .push(notification);
        Ok(())
    }
}

// =============================================================================
// Tracing implementations
// =============================================================================

pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, record: AuditRecord) -> Result<(), ActionError> {
        tracing::info!(
            target: "conductor::audit",
            action_id = %record.action_id,
            user_id = %record.user_id,
            module = %record.module,
            operation = %record.operation,
            success = record.success,
            elapsed_ms = record.execution_time_ms,
            error = record.error_message.as_deref().unwrap_or(""),
            "Action executed"
        );
        Ok(())
    }
}

pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), ActionError> {
        tracing::info!(
            user_id = %notification.user_id,
            approval_id = notification.approval_id.as_deref().unwrap_or(""),
            title = %notification.title,
            "{}",
            notification.body
        );
        Ok(())
    }
}
