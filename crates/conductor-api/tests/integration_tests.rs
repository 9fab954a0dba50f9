//! Integration tests for the Conductor API.
//!
//! Every test builds its own router over fresh in-memory state and drives it
//! with `oneshot` requests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use conductor_api::create_router;
use conductor_api::handlers::{HealthResponse, OperationSupport};
use conductor_api::state::AppState;
use conductor_core::config::ConductorConfig;

// =============================================================================
// Helpers
// =============================================================================

const TEST_TOKEN: &str = "test-token-12345";

fn make_state() -> AppState {
    AppState::in_memory(ConductorConfig::default(), TEST_TOKEN.to_string())
}

fn make_app() -> axum::Router {
    create_router(make_state())
}

fn authed_get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap()
}

fn authed_post_json(uri: &str, json: &Value) -> Request<Body> {
    Request::post(uri)
        .header("authorization", format!("Bearer {}", TEST_TOKEN))
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn authed_delete(uri: &str) -> Request<Body> {
    Request::delete(uri)
        .header("authorization", format!("Bearer {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn user_context() -> Value {
    json!({"userId": "u1", "businessId": "b1"})
}

fn create_folder_action(id: &str) -> Value {
    json!({
        "id": id,
        "type": "drive",
        "module": "drive",
        "operation": "create_folder",
        "parameters": {"name": "Invoices"},
        "requiresApproval": false,
        "affectedUsers": [],
        "reasoning": "keep invoices together"
    })
}

fn gated_delete_action(id: &str) -> Value {
    json!({
        "id": id,
        "type": "drive",
        "module": "drive",
        "operation": "delete_file",
        "parameters": {"fileId": "f-42"},
        "requiresApproval": true,
        "affectedUsers": ["u2"],
        "reasoning": "duplicate upload"
    })
}

async fn execute(app: &axum::Router, actions: Vec<Value>) -> Value {
    let resp = app
        .clone()
        .oneshot(authed_post_json(
            "/actions/execute",
            &json!({"actions": actions, "userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_no_auth_required() {
    let resp = make_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.registered_executors, 0);
    assert!(health.modules.contains(&"drive".to_string()));
    assert!(health.modules.contains(&"scheduling".to_string()));
}

#[tokio::test]
async fn test_missing_token_returns_401() {
    let resp = make_app()
        .oneshot(Request::get("/executors").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_wrong_token_returns_401() {
    let resp = make_app()
        .oneshot(
            Request::get("/approvals/pending")
                .header("authorization", "Bearer nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_header_returns_401() {
    let resp = make_app()
        .oneshot(
            Request::get("/executors")
                .header("authorization", format!("Token {}", TEST_TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Execution and rollback
// =============================================================================

#[tokio::test]
async fn test_execute_create_folder_offers_rollback() {
    let app = make_app();
    let results = execute(&app, vec![create_folder_action("a1")]).await;

    let result = &results[0];
    assert_eq!(result["actionId"], "a1");
    assert_eq!(result["success"], true);
    assert_eq!(result["metadata"]["module"], "drive");
    assert_eq!(result["metadata"]["operation"], "create_folder");
    assert_eq!(result["metadata"]["rollbackAvailable"], true);
    assert!(result["result"]["folderId"].is_string());
}

#[tokio::test]
async fn test_batch_failures_are_isolated() {
    let app = make_app();
    let unknown_module = json!({
        "id": "a2",
        "module": "nonexistent",
        "operation": "anything",
    });
    let results = execute(
        &app,
        vec![create_folder_action("a1"), unknown_module, create_folder_action("a3")],
    )
    .await;

    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[1]["success"], false);
    assert_eq!(
        results[1]["error"],
        "No executor found for module: nonexistent"
    );
    assert_eq!(results[2]["success"], true);
}

#[tokio::test]
async fn test_batch_over_limit_rejected() {
    let mut config = ConductorConfig::default();
    config.engine.max_batch_size = 1;
    let app = create_router(AppState::in_memory(config, TEST_TOKEN.to_string()));

    let resp = app
        .oneshot(authed_post_json(
            "/actions/execute",
            &json!({
                "actions": [create_folder_action("a1"), create_folder_action("a2")],
                "userContext": user_context(),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rollback_then_second_rollback_is_404() {
    let app = make_app();
    execute(&app, vec![create_folder_action("a1")]).await;

    let resp = app
        .clone()
        .oneshot(authed_post_json(
            "/actions/a1/rollback",
            &json!({"userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["actionId"], "a1");
    assert_eq!(body["result"]["stepsExecuted"], 1);

    let resp = app
        .oneshot(authed_post_json(
            "/actions/a1/rollback",
            &json!({"userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Approvals
// =============================================================================

#[tokio::test]
async fn test_gated_action_waits_for_approval_then_resumes() {
    let app = make_app();
    let results = execute(&app, vec![gated_delete_action("a9")]).await;

    let denied = &results[0];
    assert_eq!(denied["success"], false);
    assert_eq!(denied["error"], "Action requires approval");
    let request_id = denied["result"]["approvalRequestId"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = app
        .clone()
        .oneshot(authed_get("/approvals/pending"))
        .await
        .unwrap();
    let pending = body_json(resp).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["id"], request_id.as_str());
    assert_eq!(pending[0]["status"], "pending");

    // Resuming before a decision is a conflict.
    let resp = app
        .clone()
        .oneshot(authed_post_json(
            &format!("/approvals/{}/resume", request_id),
            &json!({"userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .clone()
        .oneshot(authed_post_json(
            &format!("/approvals/{}/responses", request_id),
            &json!({"userId": "u2", "response": "approve", "reasoning": "fine"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "approved");

    let resp = app
        .clone()
        .oneshot(authed_post_json(
            &format!("/approvals/{}/resume", request_id),
            &json!({"userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let executed = body_json(resp).await;
    assert_eq!(executed["actionId"], "a9");
    assert_eq!(executed["success"], true);

    // A request runs at most once.
    let resp = app
        .oneshot(authed_post_json(
            &format!("/approvals/{}/resume", request_id),
            &json!({"userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rejected_request_cannot_resume() {
    let app = make_app();
    let results = execute(&app, vec![gated_delete_action("a9")]).await;
    let request_id = results[0]["result"]["approvalRequestId"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = app
        .clone()
        .oneshot(authed_post_json(
            &format!("/approvals/{}/responses", request_id),
            &json!({"userId": "u2", "response": "reject"}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["status"], "rejected");

    let resp = app
        .oneshot(authed_post_json(
            &format!("/approvals/{}/resume", request_id),
            &json!({"userContext": user_context()}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_respond_to_unknown_request_is_404() {
    let resp = make_app()
        .oneshot(authed_post_json(
            "/approvals/missing/responses",
            &json!({"userId": "u2", "response": "approve"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Executor registry
// =============================================================================

#[tokio::test]
async fn test_register_list_and_remove_executor() {
    let app = make_app();
    let resp = app
        .clone()
        .oneshot(authed_post_json(
            "/executors",
            &json!({
                "moduleId": "crm",
                "supportedOperations": ["create_lead", "close_lead"],
                "executorType": "webhook",
                "webhookConfig": {"executorUrl": "http://127.0.0.1:9/hook", "apiKey": "secret"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let info = body_json(resp).await;
    assert_eq!(info["moduleId"], "crm");
    assert_eq!(info["executorType"], "webhook");
    assert!(info.get("apiKey").is_none());

    let resp = app.clone().oneshot(authed_get("/executors")).await.unwrap();
    let all = body_json(resp).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let resp = app
        .clone()
        .oneshot(authed_get("/executors/crm/operations/create_lead"))
        .await
        .unwrap();
    let support: OperationSupport = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(support.supported);

    let resp = app
        .clone()
        .oneshot(authed_get("/executors/crm/operations/delete_lead"))
        .await
        .unwrap();
    let support: OperationSupport = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(!support.supported);

    let resp = app.clone().oneshot(authed_delete("/executors/crm")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(authed_delete("/executors/crm")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_executor_validation() {
    let app = make_app();

    let resp = app
        .clone()
        .oneshot(authed_post_json(
            "/executors",
            &json!({"moduleId": "crm", "supportedOperations": ["create_lead"]}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Webhook executors require an executorUrl"));

    let resp = app
        .clone()
        .oneshot(authed_post_json(
            "/executors",
            &json!({"moduleId": "crm", "executorType": "in-process", "supportedOperations": ["x"]}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(authed_post_json(
            "/executors",
            &json!({
                "moduleId": "drive",
                "supportedOperations": ["create_folder"],
                "webhookConfig": {"executorUrl": "http://127.0.0.1:9/hook"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test]
async fn test_assign_and_list_shifts() {
    let app = make_app();
    let resp = app
        .clone()
        .oneshot(authed_post_json(
            "/scheduling/shifts",
            &json!({
                "shiftId": "s1",
                "employeeId": "e1",
                "businessId": "b1",
                "assignedBy": "u1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let assignment = body_json(resp).await;
    assert_eq!(assignment["shiftId"], "s1");

    let resp = app
        .clone()
        .oneshot(authed_get("/scheduling/shifts?employeeId=e1"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

    let resp = app
        .oneshot(authed_get("/scheduling/shifts?employeeId=e2"))
        .await
        .unwrap();
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduling_action_shares_roster_with_api() {
    let app = make_app();
    let action = json!({
        "id": "a5",
        "module": "scheduling",
        "operation": "assign_shift",
        "parameters": {"shiftId": "s7", "employeeId": "e3"},
    });
    let results = execute(&app, vec![action]).await;
    assert_eq!(results[0]["success"], true);

    let resp = app
        .oneshot(authed_get("/scheduling/shifts?shiftId=s7"))
        .await
        .unwrap();
    let shifts = body_json(resp).await;
    assert_eq!(shifts[0]["employeeId"], "e3");
    assert_eq!(shifts[0]["businessId"], "b1");
}
