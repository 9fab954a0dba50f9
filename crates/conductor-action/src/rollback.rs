//! Rollback plans: creation and TTL-aware storage.
//!
//! A plan is stored per executed action id. After a successful forward run
//! the dispatcher arms its expiry; once the expiry passes the plan reads as
//! absent even if the cleanup timer has not fired yet.

use async_trait::async_trait;
use conductor_core::error::ConductorError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ActionError;
use crate::handler::ModuleHandler;
use crate::types::{Action, RollbackPlan, RollbackStep};

/// Keyed store of rollback plans.
#[async_trait]
pub trait RollbackStore: Send + Sync {
    async fn put(&self, action_id: &str, plan: RollbackPlan) -> Result<(), ActionError>;

    /// The live plan for `action_id`. Expired plans read as `None`.
    async fn get(&self, action_id: &str) -> Result<Option<RollbackPlan>, ActionError>;

    /// Remove a plan. Returns `true` if one was stored.
    async fn remove(&self, action_id: &str) -> Result<bool, ActionError>;

    async fn contains(&self, action_id: &str) -> Result<bool, ActionError> {
        Ok(self.get(action_id).await?.is_some())
    }

    /// Arm expiry `ttl` from now.
    async fn set_expiry(&self, action_id: &str, ttl: Duration) -> Result<(), ActionError>;

    /// Drop the plan if its expiry has passed. Returns `true` if removed.
    async fn remove_if_expired(&self, action_id: &str) -> Result<bool, ActionError>;
}

struct StoredPlan {
    plan: RollbackPlan,
    expires_at: Option<Instant>,
}

impl StoredPlan {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory [`RollbackStore`] on the tokio clock.
#[derive(Default)]
pub struct InMemoryRollbackStore {
    plans: Mutex<HashMap<String, StoredPlan>>,
}

impl InMemoryRollbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredPlan>>, ActionError> {
        self.plans
            .lock()
            .map_err(|_| ConductorError::lock_poisoned("rollback plans").into())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.plans.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RollbackStore for InMemoryRollbackStore {
    async fn put(&self, action_id: &str, plan: RollbackPlan) -> Result<(), ActionError> {
        self.lock()?.insert(
            action_id.to_string(),
            StoredPlan {
                plan,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn get(&self, action_id: &str) -> Result<Option<RollbackPlan>, ActionError> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .get(action_id)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.plan.clone()))
    }

    async fn remove(&self, action_id: &str) -> Result<bool, ActionError> {
        Ok(self.lock()?.remove(action_id).is_some())
    }

    async fn set_expiry(&self, action_id: &str, ttl: Duration) -> Result<(), ActionError> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            ActionError::RollbackTimeoutOutOfRange(ttl.as_secs() / 60)
        })?;
        if let Some(stored) = self.lock()?.get_mut(action_id) {
            stored.expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn remove_if_expired(&self, action_id: &str) -> Result<bool, ActionError> {
        let now = Instant::now();
        let mut plans = self.lock()?;
        if plans.get(action_id).is_some_and(|stored| stored.is_expired(now)) {
            plans.remove(action_id);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Build the compensating plan for `action`.
///
/// Steps come from the owning module handler. Modules without a handler
/// (registry executors) get an empty plan, which rolls back as a no-op.
pub fn create_plan(
    handler: Option<&dyn ModuleHandler>,
    action: &Action,
    timeout_minutes: u64,
) -> RollbackPlan {
    let steps = handler
        .map(|h| h.rollback_steps(action))
        .unwrap_or_default();
    RollbackPlan {
        steps,
        conditions: Vec::new(),
        timeout_minutes,
    }
}

/// Retention window for a plan kept `timeout_minutes`.
///
/// Fails when the window cannot be represented on the clock.
pub fn plan_ttl(timeout_minutes: u64) -> Result<Duration, ActionError> {
    timeout_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .filter(|ttl| Instant::now().checked_add(*ttl).is_some())
        .ok_or(ActionError::RollbackTimeoutOutOfRange(timeout_minutes))
}

/// Steps in execution order: descending `order`.
pub fn execution_order(plan: &RollbackPlan) -> Vec<RollbackStep> {
    let mut steps = plan.steps.clone();
    steps.sort_by(|a, b| b.order.cmp(&a.order));
    steps
}

/// Id of the synthetic action that runs one rollback step.
pub fn step_action_id(action_id: &str, order: i32) -> String {
    format!("rollback_{}_{}", action_id, order)
}
