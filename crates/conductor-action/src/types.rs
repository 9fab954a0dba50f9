//! Core types and value objects for the action engine.
//!
//! Defines actions, execution results, approval requests, and rollback plans.
//! All wire-facing types serialize with camelCase keys.

use conductor_core::config::EngineConfig;
use conductor_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Handler-specific parameters, opaque to the dispatcher.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Actions and results
// =============================================================================

/// Identity and scope of the user on whose behalf actions run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            business_id: None,
            household_id: None,
            roles: Vec::new(),
        }
    }
}

/// One unit of work proposed by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    #[serde(rename = "type", default)]
    pub action_type: String,
    pub module: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub affected_users: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// Output of a module handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub output: Option<serde_json::Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            output: Some(output),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            output: None,
        }
    }
}

/// Timing and provenance attached to every [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    /// Wall-clock execution time in milliseconds.
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    pub module: String,
    pub operation: String,
    #[serde(default)]
    pub affected_users: Vec<String>,
    #[serde(default)]
    pub rollback_available: bool,
}

/// Uniform outcome of every dispatch path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub action_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ExecutionMetadata,
}

impl ExecutionResult {
    /// A failed result that never reached (or never finished in) a handler.
    pub fn failed(action: &Action, error: impl Into<String>) -> Self {
        Self {
            action_id: action.id.clone(),
            success: false,
            result: None,
            error: Some(error.into()),
            metadata: ExecutionMetadata {
                execution_time_ms: 0,
                module: action.module.clone(),
                operation: action.operation.clone(),
                affected_users: action.affected_users.clone(),
                rollback_available: false,
            },
        }
    }
}

/// Audit line appended for every forward execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub action_id: String,
    pub user_id: String,
    pub module: String,
    pub operation: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
    pub executed_at: Timestamp,
}

// =============================================================================
// Approval
// =============================================================================

/// Lifecycle of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
            ApprovalStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "expired" => Ok(ApprovalStatus::Expired),
            _ => Err(format!("Unknown approval status: {}", s)),
        }
    }
}

/// A reviewer's answer to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Approve,
    Reject,
    Modify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub user_id: String,
    pub response: ResponseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Parameter overrides applied to the action when it is resumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifications: Option<Parameters>,
    pub timestamp: Timestamp,
}

/// A gated action awaiting a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    pub user_id: String,
    pub action: Action,
    pub reasoning: String,
    pub affected_users: Vec<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub responses: Vec<ApprovalResponse>,
    /// Set once an approved request has been resumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<Timestamp>,
}

/// Outcome of consulting the approval gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

// =============================================================================
// Rollback
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackStep {
    pub module: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Parameters,
    pub order: i32,
}

/// Compensating steps that undo one executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackPlan {
    pub steps: Vec<RollbackStep>,
    #[serde(default)]
    pub conditions: Vec<String>,
    pub timeout_minutes: u64,
}

// =============================================================================
// Configuration
// =============================================================================

/// Engine settings consumed by the gate, dispatcher, and webhook client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    pub approval_ttl_hours: u32,
    pub rollback_timeout_minutes: u64,
    pub webhook_timeout_ms: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            approval_ttl_hours: 24,
            rollback_timeout_minutes: 60,
            webhook_timeout_ms: 30_000,
        }
    }
}

impl From<&EngineConfig> for ActionConfig {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            approval_ttl_hours: engine.approval_ttl_hours,
            rollback_timeout_minutes: engine.rollback_timeout_minutes,
            webhook_timeout_ms: engine.webhook_timeout_ms,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
