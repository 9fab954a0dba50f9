//! Local webhook executor used by tests.

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "actionId": body["actionId"],
        "success": true,
        "result": {"operation": body["action"], "userId": body["userId"]},
    }))
}

async fn never_answers() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Json(json!({"actionId": "late", "success": true}))
}

async fn garbage() -> &'static str {
    "<html>oops</html>"
}

/// Serve `/echo`, `/slow`, and `/garbage` on an ephemeral port and return
/// the base URL.
pub(crate) async fn spawn_webhook_executor() -> String {
    let app = Router::new()
        .route("/echo", post(echo))
        .route("/slow", post(never_answers))
        .route("/garbage", post(garbage));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
