//! Route handler functions for all API endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use conductor_action::{
    Action, ApprovalRequest, ApprovalResponse, ExecutionResult, ExecutorInfo, ExecutorType,
    ModuleExecutorRegistration, Parameters, ResponseKind, ShiftAssignment, ShiftFilter,
    ShiftRequest, UserContext, WebhookConfig,
};
use conductor_core::types::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub actions: Vec<Action>,
    pub user_context: UserContext,
}

/// Body for endpoints that only need the caller's identity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContextBody {
    pub user_context: UserContext,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponseBody {
    pub user_id: String,
    pub response: ResponseKind,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub modifications: Option<Parameters>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterExecutorRequest {
    pub module_id: String,
    #[serde(default)]
    pub supported_operations: Vec<String>,
    #[serde(default = "default_executor_type")]
    pub executor_type: ExecutorType,
    #[serde(default)]
    pub webhook_config: Option<WebhookConfig>,
}

fn default_executor_type() -> ExecutorType {
    ExecutorType::Webhook
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignShiftRequest {
    #[serde(flatten)]
    pub shift: ShiftRequest,
    pub assigned_by: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub modules: Vec<String>,
    pub registered_executors: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSupport {
    pub module_id: String,
    pub operation: String,
    pub supported: bool,
}

// =============================================================================
// Health
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let dispatcher = &state.dispatcher;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime().as_secs(),
        modules: dispatcher.handlers().modules(),
        registered_executors: dispatcher.executors().list_modules()?.len(),
    }))
}

// =============================================================================
// Actions
// =============================================================================

/// POST /actions/execute - run a batch sequentially.
pub async fn execute_actions(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<Vec<ExecutionResult>>, ApiError> {
    let limit = state.config.engine.max_batch_size;
    if req.actions.len() > limit {
        return Err(ApiError::BadRequest(format!(
            "Batch of {} actions exceeds the limit of {}",
            req.actions.len(),
            limit
        )));
    }
    if req.user_context.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userContext.userId is required".to_string()));
    }

    let results = state
        .dispatcher
        .execute_actions(&req.actions, &req.user_context)
        .await;
    Ok(Json(results))
}

/// POST /actions/{id}/rollback
pub async fn rollback_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
    Json(body): Json<UserContextBody>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let result = state
        .dispatcher
        .rollback_action(&action_id, &body.user_context)
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Approvals
// =============================================================================

/// GET /approvals/pending
pub async fn pending_approvals(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApprovalRequest>>, ApiError> {
    let pending = state
        .dispatcher
        .approvals()
        .list_pending(Timestamp::now())
        .await?;
    Ok(Json(pending))
}

/// POST /approvals/{id}/responses
pub async fn respond_to_approval(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<ApprovalResponseBody>,
) -> Result<Json<ApprovalRequest>, ApiError> {
    if body.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userId is required".to_string()));
    }
    let response = ApprovalResponse {
        user_id: body.user_id,
        response: body.response,
        reasoning: body.reasoning,
        modifications: body.modifications,
        timestamp: Timestamp::now(),
    };
    let updated = state
        .dispatcher
        .approvals()
        .record_response(&request_id, response)
        .await?;
    tracing::info!(request_id = %request_id, status = %updated.status, "Approval response recorded");
    Ok(Json(updated))
}

/// POST /approvals/{id}/resume - execute an approved request.
pub async fn resume_approval(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<UserContextBody>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let result = state
        .dispatcher
        .resume_approved(&request_id, &body.user_context)
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Executor registry
// =============================================================================

/// GET /executors
pub async fn list_executors(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExecutorInfo>>, ApiError> {
    Ok(Json(state.dispatcher.executors().get_all()?))
}

/// POST /executors - register a webhook executor.
pub async fn register_executor(
    State(state): State<AppState>,
    Json(req): Json<RegisterExecutorRequest>,
) -> Result<(StatusCode, Json<ExecutorInfo>), ApiError> {
    if req.executor_type != ExecutorType::Webhook {
        return Err(ApiError::BadRequest(
            "Only webhook executors can be registered over HTTP".to_string(),
        ));
    }
    if state.is_builtin_module(&req.module_id) {
        return Err(ApiError::Conflict(format!(
            "Module '{}' is built in and cannot be replaced",
            req.module_id
        )));
    }

    let module_id = req.module_id.clone();
    let registration = ModuleExecutorRegistration {
        module_id: req.module_id,
        supported_operations: req.supported_operations,
        executor_type: req.executor_type,
        executor: None,
        webhook_config: req.webhook_config,
    };
    let executors = state.dispatcher.executors();
    executors.register(registration)?;

    let info = executors
        .get_all()?
        .into_iter()
        .find(|info| info.module_id == module_id)
        .ok_or_else(|| ApiError::Internal(format!("Executor {} vanished", module_id)))?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// DELETE /executors/{module_id}
pub async fn unregister_executor(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.dispatcher.executors().unregister(&module_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "No executor registered for module: {}",
            module_id
        )))
    }
}

/// GET /executors/{module_id}/operations/{operation}
pub async fn supports_operation(
    State(state): State<AppState>,
    Path((module_id, operation)): Path<(String, String)>,
) -> Result<Json<OperationSupport>, ApiError> {
    let supported = state
        .dispatcher
        .executors()
        .supports_operation(&module_id, &operation)?;
    Ok(Json(OperationSupport {
        module_id,
        operation,
        supported,
    }))
}

// =============================================================================
// Scheduling
// =============================================================================

/// POST /scheduling/shifts
pub async fn assign_shift(
    State(state): State<AppState>,
    Json(req): Json<AssignShiftRequest>,
) -> Result<(StatusCode, Json<ShiftAssignment>), ApiError> {
    let assignment = state.schedule.assign_shift(req.shift, &req.assigned_by)?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// GET /scheduling/shifts
pub async fn list_shifts(
    State(state): State<AppState>,
    Query(filter): Query<ShiftFilter>,
) -> Result<Json<Vec<ShiftAssignment>>, ApiError> {
    Ok(Json(state.schedule.list_shifts(&filter)?))
}
