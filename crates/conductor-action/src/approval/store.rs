//! Approval request persistence.

use async_trait::async_trait;
use conductor_core::error::ConductorError;
use conductor_core::types::Timestamp;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::state_machine::{apply_response, expire_if_due};
use crate::error::ActionError;
use crate::types::{ApprovalRequest, ApprovalResponse, ApprovalStatus};

/// Keyed store of approval requests.
///
/// Implementations must apply status changes atomically per request.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn save(&self, request: ApprovalRequest) -> Result<(), ActionError>;

    async fn get(&self, id: &str) -> Result<Option<ApprovalRequest>, ActionError>;

    /// Append a reviewer response and apply the resulting transition.
    async fn record_response(
        &self,
        id: &str,
        response: ApprovalResponse,
    ) -> Result<ApprovalRequest, ActionError>;

    /// Pending requests that have not yet passed their deadline.
    async fn list_pending(&self, now: Timestamp) -> Result<Vec<ApprovalRequest>, ActionError>;

    /// Mark every pending request past its deadline as expired. Returns the
    /// ids that changed.
    async fn expire_stale(&self, now: Timestamp) -> Result<Vec<String>, ActionError>;

    /// Claim an approved request for execution. Fails unless the request is
    /// approved and has not been claimed before.
    async fn mark_executed(&self, id: &str, now: Timestamp)
        -> Result<ApprovalRequest, ActionError>;
}

/// In-memory [`ApprovalStore`].
#[derive(Default)]
pub struct InMemoryApprovalStore {
    requests: Mutex<HashMap<String, ApprovalRequest>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ApprovalRequest>>, ActionError> {
        self.requests
            .lock()
            .map_err(|_| ConductorError::lock_poisoned("approval requests").into())
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn save(&self, request: ApprovalRequest) -> Result<(), ActionError> {
        self.lock()?.insert(request.id.clone(), request);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ApprovalRequest>, ActionError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn record_response(
        &self,
        id: &str,
        response: ApprovalResponse,
    ) -> Result<ApprovalRequest, ActionError> {
        let mut requests = self.lock()?;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| ActionError::ApprovalNotFound(id.to_string()))?;
        apply_response(request, response, Timestamp::now())?;
        Ok(request.clone())
    }

    async fn list_pending(&self, now: Timestamp) -> Result<Vec<ApprovalRequest>, ActionError> {
        let requests = self.lock()?;
        let mut pending: Vec<ApprovalRequest> = requests
            .values()
            .filter(|r| r.status == ApprovalStatus::Pending && !r.expires_at.has_passed(now))
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn expire_stale(&self, now: Timestamp) -> Result<Vec<String>, ActionError> {
        let mut requests = self.lock()?;
        Ok(requests
            .values_mut()
            .filter_map(|r| expire_if_due(r, now).then(|| r.id.clone()))
            .collect())
    }

    async fn mark_executed(
        &self,
        id: &str,
        now: Timestamp,
    ) -> Result<ApprovalRequest, ActionError> {
        let mut requests = self.lock()?;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| ActionError::ApprovalNotFound(id.to_string()))?;
        if request.status != ApprovalStatus::Approved {
            return Err(ActionError::ApprovalClosed {
                id: id.to_string(),
                status: request.status,
            });
        }
        if request.executed_at.is_some() {
            return Err(ActionError::ApprovalAlreadyExecuted(id.to_string()));
        }
        request.executed_at = Some(now);
        Ok(request.clone())
    }
}
