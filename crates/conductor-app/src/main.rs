//! Conductor application binary, the composition root.
//!
//! 1. Load configuration from TOML
//! 2. Build the dispatcher with the built-in modules
//! 3. Register webhook executors listed in the config
//! 4. Start the approval expiry sweeper
//! 5. Serve the REST API until Ctrl-C

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use conductor_action::ApprovalSweeper;
use conductor_api::auth::resolve_token;
use conductor_api::routes;
use conductor_api::state::AppState;
use conductor_core::config::ConductorConfig;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = ConductorConfig::load_or_default(&config_file);
    config.server.port = args.resolve_port(config.server.port);

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Conductor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let token_path = cli::conductor_home().join("api_token");
    let api_token = resolve_token(config.server.api_token.as_deref(), &token_path);

    let state = AppState::in_memory(config.clone(), api_token);
    let registered = state.register_webhook_executors(&config.executors);
    tracing::info!(
        modules = ?state.dispatcher.handlers().modules(),
        executors = registered,
        "Dispatcher ready"
    );

    // === Background tasks ===

    let sweeper = Arc::new(ApprovalSweeper::new(
        Arc::clone(state.dispatcher.approvals()),
        Duration::from_secs(config.engine.approval_sweep_interval_secs.max(1)),
    ));
    let sweeper_task = {
        let sweeper = Arc::clone(&sweeper);
        tokio::spawn(async move { sweeper.run().await })
    };

    // === API server ===

    let shutdown = {
        let sweeper = Arc::clone(&sweeper);
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
            sweeper.shutdown();
        }
    };

    let served = routes::start_server(&config.server, state, shutdown).await;

    // Covers a server that exits on its own, e.g. a failed bind.
    sweeper.shutdown();
    if let Err(e) = sweeper_task.await {
        tracing::warn!(error = %e, "Approval sweeper task ended abnormally");
    }

    if let Err(e) = served {
        tracing::error!(
            host = %config.server.host,
            port = config.server.port,
            error = %e,
            "API server failed; is another instance running?"
        );
        return Err(e.into());
    }
    Ok(())
}
