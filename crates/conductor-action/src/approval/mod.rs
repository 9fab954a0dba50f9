//! Approval gate for actions that need a human decision.
//!
//! The gate never waits. A gated action is recorded as a pending
//! [`ApprovalRequest`], affected users are notified, and the caller gets a
//! denial carrying the request id. Reviewers answer through
//! [`ApprovalStore::record_response`]; an approved request is executed later
//! by `Dispatcher::resume_approved`.

pub mod state_machine;
pub mod store;

pub use store::{ApprovalStore, InMemoryApprovalStore};

use conductor_core::types::Timestamp;
use std::sync::Arc;
use uuid::Uuid;

use crate::collaborator::{Notification, Notifier};
use crate::error::ActionError;
use crate::types::{Action, ApprovalDecision, ApprovalRequest, ApprovalStatus, UserContext};

/// Reason reported while a request awaits review.
pub const APPROVAL_PENDING: &str = "Approval pending";

pub struct ApprovalGate {
    store: Arc<dyn ApprovalStore>,
    notifier: Arc<dyn Notifier>,
    ttl_hours: u32,
}

impl ApprovalGate {
    pub fn new(store: Arc<dyn ApprovalStore>, notifier: Arc<dyn Notifier>, ttl_hours: u32) -> Self {
        Self {
            store,
            notifier,
            ttl_hours,
        }
    }

    pub fn store(&self) -> &Arc<dyn ApprovalStore> {
        &self.store
    }

    /// Decide whether `action` may run now.
    ///
    /// Actions without `requires_approval` are cleared immediately. Gated
    /// actions are persisted as pending requests and denied. `summary` is
    /// the human-readable text sent to affected users.
    pub async fn check(
        &self,
        action: &Action,
        ctx: &UserContext,
        summary: &str,
    ) -> Result<ApprovalDecision, ActionError> {
        if !action.requires_approval {
            return Ok(ApprovalDecision {
                approved: true,
                reason: None,
                request_id: None,
            });
        }

        let now = Timestamp::now();
        let request = ApprovalRequest {
            id: Uuid::new_v4().to_string(),
            user_id: ctx.user_id.clone(),
            action: action.clone(),
            reasoning: action.reasoning.clone(),
            affected_users: action.affected_users.clone(),
            created_at: now,
            expires_at: now.plus_hours(self.ttl_hours),
            status: ApprovalStatus::Pending,
            responses: Vec::new(),
            executed_at: None,
        };
        self.store.save(request.clone()).await?;

        for user_id in &request.affected_users {
            let notification = Notification::approval_needed(user_id, &request, summary);
            if let Err(e) = self.notifier.notify(notification).await {
                tracing::warn!(
                    request_id = %request.id,
                    user_id = %user_id,
                    error = %e,
                    "Failed to notify user of pending approval"
                );
            }
        }

        tracing::info!(
            action_id = %action.id,
            request_id = %request.id,
            module = %action.module,
            operation = %action.operation,
            "Approval requested"
        );

        Ok(ApprovalDecision {
            approved: false,
            reason: Some(APPROVAL_PENDING.to_string()),
            request_id: Some(request.id),
        })
    }
}
