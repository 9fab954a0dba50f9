//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use conductor_core::config::ServerConfig;
use conductor_core::error::ConductorError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health));

    let protected_routes = Router::new()
        .route("/actions/execute", post(handlers::execute_actions))
        .route("/actions/{id}/rollback", post(handlers::rollback_action))
        .route("/approvals/pending", get(handlers::pending_approvals))
        .route(
            "/approvals/{id}/responses",
            post(handlers::respond_to_approval),
        )
        .route("/approvals/{id}/resume", post(handlers::resume_approval))
        .route(
            "/executors",
            get(handlers::list_executors).post(handlers::register_executor),
        )
        .route("/executors/{module_id}", delete(handlers::unregister_executor))
        .route(
            "/executors/{module_id}/operations/{operation}",
            get(handlers::supports_operation),
        )
        .route(
            "/scheduling/shifts",
            get(handlers::list_shifts).post(handlers::assign_shift),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `host:port` from `server` and serve until `shutdown` resolves.
pub async fn start_server<F>(
    server: &ServerConfig,
    state: AppState,
    shutdown: F,
) -> Result<(), ConductorError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", server.host, server.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Conductor API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
