//! Action dispatcher.
//!
//! Runs planner batches one action at a time. Each action passes the
//! approval gate, gets a rollback plan, and is routed to a built-in module
//! handler or, failing that, to the runtime executor registry. Every
//! outcome is reported as an [`ExecutionResult`]; a failure never stops the
//! rest of the batch.

use conductor_core::types::Timestamp;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::approval::{ApprovalGate, ApprovalStore, InMemoryApprovalStore};
use crate::collaborator::{AuditLog, Notifier, TracingAuditLog, TracingNotifier};
use crate::error::ActionError;
use crate::handler::{HandlerRegistry, ModuleHandler};
use crate::registry::ExecutorRegistry;
use crate::rollback::{self, InMemoryRollbackStore, RollbackStore};
use crate::types::{
    Action, ActionConfig, ApprovalDecision, AuditRecord, ExecutionMetadata, ExecutionResult,
    UserContext,
};

/// Error reported for actions held back by the approval gate.
pub const REQUIRES_APPROVAL: &str = "Action requires approval";

/// Handler-level outcome before metadata is attached.
struct Outcome {
    success: bool,
    result: Option<Value>,
    error: Option<String>,
}

pub struct Dispatcher {
    handlers: HandlerRegistry,
    executors: Arc<ExecutorRegistry>,
    gate: ApprovalGate,
    rollback_store: Arc<dyn RollbackStore>,
    audit: Arc<dyn AuditLog>,
    config: ActionConfig,
}

/// Builder for [`Dispatcher`]. Collaborators not supplied default to the
/// in-memory stores and the tracing-backed audit log and notifier.
pub struct DispatcherBuilder {
    handlers: HandlerRegistry,
    executors: Arc<ExecutorRegistry>,
    config: ActionConfig,
    approvals: Option<Arc<dyn ApprovalStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    rollback_store: Option<Arc<dyn RollbackStore>>,
    audit: Option<Arc<dyn AuditLog>>,
}

impl DispatcherBuilder {
    pub fn approval_store(mut self, store: Arc<dyn ApprovalStore>) -> Self {
        self.approvals = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn rollback_store(mut self, store: Arc<dyn RollbackStore>) -> Self {
        self.rollback_store = Some(store);
        self
    }

    pub fn audit_log(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> Dispatcher {
        let approvals = self
            .approvals
            .unwrap_or_else(|| Arc::new(InMemoryApprovalStore::new()));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));
        Dispatcher {
            gate: ApprovalGate::new(approvals, notifier, self.config.approval_ttl_hours),
            handlers: self.handlers,
            executors: self.executors,
            rollback_store: self
                .rollback_store
                .unwrap_or_else(|| Arc::new(InMemoryRollbackStore::new())),
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditLog)),
            config: self.config,
        }
    }
}

impl Dispatcher {
    pub fn builder(
        handlers: HandlerRegistry,
        executors: Arc<ExecutorRegistry>,
        config: ActionConfig,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            handlers,
            executors,
            config,
            approvals: None,
            notifier: None,
            rollback_store: None,
            audit: None,
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn executors(&self) -> &Arc<ExecutorRegistry> {
        &self.executors
    }

    pub fn approvals(&self) -> &Arc<dyn ApprovalStore> {
        self.gate.store()
    }

    /// True while a rollback plan is held for `action_id`.
    pub async fn rollback_available(&self, action_id: &str) -> Result<bool, ActionError> {
        self.rollback_store.contains(action_id).await
    }

    /// Execute a batch sequentially, in input order.
    ///
    /// Always returns one result per action. Errors become failed results
    /// with zero execution time and no rollback.
    pub async fn execute_actions(
        &self,
        actions: &[Action],
        ctx: &UserContext,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let result = match self.execute_action(action, ctx).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        action_id = %action.id,
                        module = %action.module,
                        operation = %action.operation,
                        error = %e,
                        "Action failed"
                    );
                    ExecutionResult::failed(action, e.to_string())
                }
            };
            results.push(result);
        }
        results
    }

    /// Execute one action, consulting the approval gate first.
    pub async fn execute_action(
        &self,
        action: &Action,
        ctx: &UserContext,
    ) -> Result<ExecutionResult, ActionError> {
        self.run(action, ctx, true).await
    }

    /// Execute the action of an approved request, bypassing the gate.
    ///
    /// The request is claimed before execution, so it runs at most once even
    /// if the run itself fails. Parameter modifications from reviewer
    /// responses are applied in response order.
    pub async fn resume_approved(
        &self,
        request_id: &str,
        ctx: &UserContext,
    ) -> Result<ExecutionResult, ActionError> {
        let request = self
            .approvals()
            .mark_executed(request_id, Timestamp::now())
            .await?;

        let mut action = request.action;
        for modifications in request.responses.iter().filter_map(|r| r.modifications.as_ref()) {
            for (key, value) in modifications {
                action.parameters.insert(key.clone(), value.clone());
            }
        }

        tracing::info!(
            request_id,
            action_id = %action.id,
            module = %action.module,
            operation = %action.operation,
            "Resuming approved action"
        );
        self.run(&action, ctx, false).await
    }

    /// Replay the stored rollback plan for `action_id` in descending step
    /// order.
    ///
    /// Any step failure aborts the run and leaves the plan untouched; steps
    /// that already ran are not recorded.
    pub async fn rollback_action(
        &self,
        action_id: &str,
        ctx: &UserContext,
    ) -> Result<ExecutionResult, ActionError> {
        let start = Instant::now();
        let plan = self
            .rollback_store
            .get(action_id)
            .await?
            .ok_or_else(|| ActionError::RollbackPlanNotFound(action_id.to_string()))?;

        let steps = rollback::execution_order(&plan);
        for step in &steps {
            let step_action = Action {
                id: rollback::step_action_id(action_id, step.order),
                action_type: "rollback".to_string(),
                module: step.module.clone(),
                operation: step.operation.clone(),
                parameters: step.parameters.clone(),
                requires_approval: false,
                affected_users: Vec::new(),
                reasoning: format!("Rollback of action {}", action_id),
            };

            let step_start = Instant::now();
            let handler = self.handlers.get(&step.module);
            let outcome = self.dispatch(handler.as_deref(), &step_action, ctx).await;
            self.audit(&step_action, ctx, &outcome, elapsed_ms(step_start)).await;

            let failure = match outcome {
                Ok(o) if o.success => None,
                Ok(o) => Some(o.error.unwrap_or_else(|| "step reported failure".to_string())),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                tracing::error!(
                    action_id,
                    step = step.order,
                    module = %step.module,
                    operation = %step.operation,
                    error = %reason,
                    "Rollback step failed"
                );
                return Err(ActionError::Rollback(format!(
                    "step {} ({}.{}): {}",
                    step.order, step.module, step.operation, reason
                )));
            }
        }

        self.rollback_store.remove(action_id).await?;
        tracing::info!(action_id, steps = steps.len(), "Rollback completed");

        Ok(ExecutionResult {
            action_id: action_id.to_string(),
            success: true,
            result: Some(json!({"stepsExecuted": steps.len()})),
            error: None,
            metadata: ExecutionMetadata {
                execution_time_ms: elapsed_ms(start),
                module: "rollback".to_string(),
                operation: "rollback".to_string(),
                affected_users: Vec::new(),
                rollback_available: false,
            },
        })
    }

    async fn run(
        &self,
        action: &Action,
        ctx: &UserContext,
        gated: bool,
    ) -> Result<ExecutionResult, ActionError> {
        let start = Instant::now();
        let handler = self.handlers.get(&action.module);

        if gated && action.requires_approval {
            let summary = match &handler {
                Some(h) => h.describe(&action.operation, &action.parameters),
                None => format!("{} {}", action.module, action.operation.replace('_', " ")),
            };
            let decision = self.gate.check(action, ctx, &summary).await?;
            if !decision.approved {
                return Ok(denied(action, decision, elapsed_ms(start)));
            }
        }

        if handler.is_none() && !self.executors.has(&action.module)? {
            return Err(ActionError::ModuleNotFound(action.module.clone()));
        }

        let ttl = rollback::plan_ttl(self.config.rollback_timeout_minutes)?;
        let plan = rollback::create_plan(
            handler.as_deref(),
            action,
            self.config.rollback_timeout_minutes,
        );
        self.rollback_store.put(&action.id, plan).await?;

        let outcome = self.dispatch(handler.as_deref(), action, ctx).await;
        let execution_time_ms = elapsed_ms(start);
        self.audit(action, ctx, &outcome, execution_time_ms).await;

        match &outcome {
            Ok(o) if o.success => self.arm_plan_expiry(&action.id, ttl).await?,
            _ => {
                self.rollback_store.remove(&action.id).await?;
            }
        }
        let outcome = outcome?;

        tracing::info!(
            action_id = %action.id,
            module = %action.module,
            operation = %action.operation,
            success = outcome.success,
            elapsed_ms = execution_time_ms,
            "Action executed"
        );

        Ok(ExecutionResult {
            action_id: action.id.clone(),
            success: outcome.success,
            result: outcome.result,
            error: outcome.error,
            metadata: ExecutionMetadata {
                execution_time_ms,
                module: action.module.clone(),
                operation: action.operation.clone(),
                affected_users: action.affected_users.clone(),
                rollback_available: self.rollback_store.contains(&action.id).await?,
            },
        })
    }

    /// Route to the built-in handler if there is one, else to the registry.
    async fn dispatch(
        &self,
        handler: Option<&dyn ModuleHandler>,
        action: &Action,
        ctx: &UserContext,
    ) -> Result<Outcome, ActionError> {
        match handler {
            Some(handler) => {
                let result = handler
                    .handle(&action.operation, &action.parameters, ctx)
                    .await?;
                Ok(Outcome {
                    success: result.success,
                    error: (!result.success).then(|| result.message.clone()),
                    result: result
                        .output
                        .or_else(|| result.success.then(|| Value::String(result.message))),
                })
            }
            None => {
                let result = self.executors.execute(action, ctx).await?;
                Ok(Outcome {
                    success: result.success,
                    result: result.result,
                    error: result.error,
                })
            }
        }
    }

    /// Expire the plan `ttl` from now and schedule its removal.
    async fn arm_plan_expiry(&self, action_id: &str, ttl: Duration) -> Result<(), ActionError> {
        self.rollback_store.set_expiry(action_id, ttl).await?;
        let store = Arc::clone(&self.rollback_store);
        let action_id = action_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            match store.remove_if_expired(&action_id).await {
                Ok(true) => tracing::debug!(action_id = %action_id, "Rollback plan expired"),
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    action_id = %action_id,
                    error = %e,
                    "Failed to drop expired rollback plan"
                ),
            }
        });
        Ok(())
    }

    async fn audit(
        &self,
        action: &Action,
        ctx: &UserContext,
        outcome: &Result<Outcome, ActionError>,
        execution_time_ms: u64,
    ) {
        let (success, error_message) = match outcome {
            Ok(o) => (o.success, o.error.clone()),
            Err(e) => (false, Some(e.to_string())),
        };
        let record = AuditRecord {
            id: Uuid::new_v4(),
            action_id: action.id.clone(),
            user_id: ctx.user_id.clone(),
            module: action.module.clone(),
            operation: action.operation.clone(),
            success,
            error_message,
            execution_time_ms,
            executed_at: Timestamp::now(),
        };
        if let Err(e) = self.audit.record(record).await {
            tracing::warn!(action_id = %action.id, error = %e, "Failed to write audit record");
        }
    }
}

fn denied(action: &Action, decision: ApprovalDecision, execution_time_ms: u64) -> ExecutionResult {
    ExecutionResult {
        action_id: action.id.clone(),
        success: false,
        result: Some(json!({
            "approvalRequestId": decision.request_id,
            "reason": decision.reason,
        })),
        error: Some(REQUIRES_APPROVAL.to_string()),
        metadata: ExecutionMetadata {
            execution_time_ms,
            module: action.module.clone(),
            operation: action.operation.clone(),
            affected_users: action.affected_users.clone(),
            rollback_available: false,
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
