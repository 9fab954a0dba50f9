//! API error types and JSON error response formatting.
//!
//! Every failure is rendered as `{error, message, details?}` with a status
//! code derived from the engine error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use conductor_action::ActionError;
use conductor_core::error::ConductorError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),
    /// 401
    Unauthorized(String),
    /// 404
    NotFound(String),
    /// 409: the resource exists but is in the wrong state.
    Conflict(String),
    /// 422: well-formed request rejected by engine validation or a handler.
    UnprocessableEntity(String),
    /// 502: a webhook executor misbehaved.
    BadGateway(String),
    /// 504
    GatewayTimeout(String),
    /// 500
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        let message = err.to_string();
        match err {
            _ if err.is_not_found() => ApiError::NotFound(message),
            ActionError::Timeout(_) => ApiError::GatewayTimeout(message),
            ActionError::WebhookStatus(_)
            | ActionError::Transport(_)
            | ActionError::InvalidResponse(_) => ApiError::BadGateway(message),
            ActionError::InvalidPayload(_)
            | ActionError::UnsupportedOperation { .. }
            | ActionError::UnknownOperation { .. } => ApiError::BadRequest(message),
            ActionError::InvalidRegistration(_)
            | ActionError::HandlerFailed(_)
            | ActionError::Rollback(_) => ApiError::UnprocessableEntity(message),
            ActionError::ApprovalClosed { .. } | ActionError::ApprovalAlreadyExecuted(_) => {
                ApiError::Conflict(message)
            }
            _ => {
                tracing::error!(error = %message, "Internal engine error");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<ConductorError> for ApiError {
    fn from(err: ConductorError) -> Self {
        match &err {
            ConductorError::Config(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
