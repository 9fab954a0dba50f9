//! Outbound client for third-party executors reachable over HTTP.
//!
//! One POST per action, bounded by a timeout. Dropping the in-flight
//! future on expiry aborts the request, so a late response is never
//! observed. Responses are untrusted and shape-checked before use.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::error::ActionError;
use crate::types::{
    Action, ActionConfig, ExecutionMetadata, ExecutionResult, Parameters, UserContext,
};

/// Where and how to reach a webhook executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    #[serde(default)]
    pub executor_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    action: &'a str,
    parameters: &'a Parameters,
    user_id: &'a str,
    context: &'a UserContext,
    action_id: &'a str,
    requires_approval: bool,
    reasoning: &'a str,
    affected_users: &'a [String],
}

#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    default_timeout_ms: u64,
}

impl WebhookClient {
    pub fn new(default_timeout_ms: u64) -> Self {
        Self::with_client(reqwest::Client::new(), default_timeout_ms)
    }

    pub fn with_client(http: reqwest::Client, default_timeout_ms: u64) -> Self {
        Self {
            http,
            default_timeout_ms,
        }
    }

    /// Timeout applied when an executor does not set its own.
    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    /// POST `action` to the executor described by `config`.
    pub async fn execute(
        &self,
        action: &Action,
        ctx: &UserContext,
        config: &WebhookConfig,
    ) -> Result<ExecutionResult, ActionError> {
        let timeout_ms = config.timeout_ms.unwrap_or(self.default_timeout_ms);
        let payload = WebhookPayload {
            action: &action.operation,
            parameters: &action.parameters,
            user_id: &ctx.user_id,
            context: ctx,
            action_id: &action.id,
            requires_approval: action.requires_approval,
            reasoning: &action.reasoning,
            affected_users: &action.affected_users,
        };

        let start = Instant::now();
        let mut request = self.http.post(&config.executor_url).json(&payload);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }

        let call = async {
            let response = request
                .send()
                .await
                .map_err(|e| ActionError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ActionError::WebhookStatus(status.as_u16()));
            }
            response
                .bytes()
                .await
                .map_err(|e| ActionError::Transport(e.to_string()))
        };

        let body = match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    action_id = %action.id,
                    module = %action.module,
                    url = %config.executor_url,
                    timeout_ms,
                    "Webhook executor timed out"
                );
                return Err(ActionError::Timeout(timeout_ms));
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let result = parse_response(action, &body, elapsed_ms)?;
        tracing::debug!(
            action_id = %action.id,
            module = %action.module,
            success = result.success,
            elapsed_ms,
            "Webhook executor responded"
        );
        Ok(result)
    }
}

impl From<&ActionConfig> for WebhookClient {
    fn from(config: &ActionConfig) -> Self {
        Self::new(config.webhook_timeout_ms)
    }
}

/// Validate a webhook response body and convert it to an [`ExecutionResult`].
fn parse_response(
    action: &Action,
    body: &[u8],
    elapsed_ms: u64,
) -> Result<ExecutionResult, ActionError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ActionError::InvalidResponse(e.to_string()))?;

    let response_id = match value.get("actionId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(ActionError::InvalidResponse(
                "missing or empty 'actionId'".to_string(),
            ))
        }
    };
    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| ActionError::InvalidResponse("missing boolean 'success'".to_string()))?;

    if response_id != action.id {
        tracing::warn!(
            action_id = %action.id,
            response_id,
            "Webhook executor answered with a different action id"
        );
    }

    Ok(ExecutionResult {
        action_id: action.id.clone(),
        success,
        result: value.get("result").filter(|v| !v.is_null()).cloned(),
        error: value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string),
        metadata: ExecutionMetadata {
            execution_time_ms: elapsed_ms,
            module: action.module.clone(),
            operation: action.operation.clone(),
            affected_users: action.affected_users.clone(),
            rollback_available: false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn ok(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "actionId": body["actionId"],
            "success": true,
            "result": {"operation": body["action"], "userId": body["userId"]},
        }))
    }

    async fn slow() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Json(json!({"actionId": "late", "success": true}))
    }

    async fn server_error() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn missing_id() -> Json<Value> {
        Json(json!({"success": true}))
    }

    async fn not_json() -> &'static str {
        "all good"
    }

    async fn auth_echo(headers: HeaderMap) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        Json(json!({"actionId": "a1", "success": true, "result": {"authorization": auth}}))
    }

    async fn reported_failure() -> Json<Value> {
        Json(json!({"actionId": "a1", "success": false, "error": "quota exceeded"}))
    }

    async fn spawn_executor() -> String {
        let app = Router::new()
            .route("/ok", post(ok))
            .route("/slow", post(slow))
            .route("/error", post(server_error))
            .route("/missing-id", post(missing_id))
            .route("/not-json", post(not_json))
            .route("/auth", post(auth_echo))
            .route("/failure", post(reported_failure));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn action() -> Action {
        Action {
            id: "a1".to_string(),
            action_type: "crm".to_string(),
            module: "crm".to_string(),
            operation: "create_lead".to_string(),
            parameters: Parameters::new(),
            requires_approval: false,
            affected_users: vec!["u2".to_string()],
            reasoning: "new inbound lead".to_string(),
        }
    }

    fn config(base: &str, path: &str) -> WebhookConfig {
        WebhookConfig {
            executor_url: format!("{}{}", base, path),
            api_key: None,
            timeout_ms: None,
        }
    }

    #[tokio::test]
    async fn test_successful_call() {
        let base = spawn_executor().await;
        let client = WebhookClient::new(5_000);
        let result = client
            .execute(&action(), &UserContext::new("u1"), &config(&base, "/ok"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.action_id, "a1");
        assert_eq!(result.result.unwrap()["operation"], "create_lead");
        assert_eq!(result.metadata.module, "crm");
        assert_eq!(result.metadata.affected_users, vec!["u2"]);
    }

    #[tokio::test]
    async fn test_timeout_aborts_call() {
        let base = spawn_executor().await;
        let client = WebhookClient::new(30_000);
        let mut cfg = config(&base, "/slow");
        cfg.timeout_ms = Some(1_000);

        let start = Instant::now();
        let err = client
            .execute(&action(), &UserContext::new("u1"), &cfg)
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("timeout after 1000ms"));
        assert!(elapsed >= Duration::from_millis(1_000));
        assert!(elapsed < Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn test_engine_default_timeout_applies_without_override() {
        let base = spawn_executor().await;
        let engine = ActionConfig {
            webhook_timeout_ms: 1_000,
            ..ActionConfig::default()
        };
        let client = WebhookClient::from(&engine);
        assert_eq!(client.default_timeout_ms(), 1_000);

        let err = client
            .execute(&action(), &UserContext::new("u1"), &config(&base, "/slow"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Webhook executor timeout after 1000ms");
    }

    #[tokio::test]
    async fn test_non_2xx_is_error() {
        let base = spawn_executor().await;
        let err = WebhookClient::new(5_000)
            .execute(&action(), &UserContext::new("u1"), &config(&base, "/error"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::WebhookStatus(500)));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_missing_action_id_is_invalid_format() {
        let base = spawn_executor().await;
        let err = WebhookClient::new(5_000)
            .execute(&action(), &UserContext::new("u1"), &config(&base, "/missing-id"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidResponse(_)));
        assert!(err
            .to_string()
            .starts_with("Invalid response format from webhook executor"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_format() {
        let base = spawn_executor().await;
        let err = WebhookClient::new(5_000)
            .execute(&action(), &UserContext::new("u1"), &config(&base, "/not-json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_api_key_sent_as_bearer() {
        let base = spawn_executor().await;
        let mut cfg = config(&base, "/auth");
        cfg.api_key = Some("sk-test".to_string());
        let result = WebhookClient::new(5_000)
            .execute(&action(), &UserContext::new("u1"), &cfg)
            .await
            .unwrap();
        assert_eq!(result.result.unwrap()["authorization"], "Bearer sk-test");
    }

    #[tokio::test]
    async fn test_reported_failure_passes_through() {
        let base = spawn_executor().await;
        let result = WebhookClient::new(5_000)
            .execute(&action(), &UserContext::new("u1"), &config(&base, "/failure"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = WebhookClient::new(5_000)
            .execute(
                &action(),
                &UserContext::new("u1"),
                &config(&format!("http://{}", addr), "/ok"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Transport(_)));
    }

    #[test]
    fn test_payload_wire_format() {
        let action = action();
        let ctx = UserContext::new("u1");
        let payload = WebhookPayload {
            action: &action.operation,
            parameters: &action.parameters,
            user_id: &ctx.user_id,
            context: &ctx,
            action_id: &action.id,
            requires_approval: action.requires_approval,
            reasoning: &action.reasoning,
            affected_users: &action.affected_users,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["action"], "create_lead");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["actionId"], "a1");
        assert_eq!(value["context"]["userId"], "u1");
        assert_eq!(value["affectedUsers"], json!(["u2"]));
        assert_eq!(value["requiresApproval"], false);
    }
}
