//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server. The workspace's
//! main `triage-run` binary serves the same router with graceful shutdown.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{config_from_env, router, session_idle_timeout_from_env, AppState};
use api_shared::AccessGate;
use triage_core::TriageService;

/// Main entry point for the triage REST API server
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `TRIAGE_ACCESS_KEY`: Access key required on session routes (unset: open)
/// - `TRIAGE_KB_PATH`, `TRIAGE_KB_URL`, `TRIAGE_FAILURE_LOG`, `TRIAGE_MATCH_THRESHOLD`,
///   `TRIAGE_MATCH_STRATEGY`: see [`config_from_env`]
/// - `TRIAGE_SESSION_IDLE_MINUTES`: idle session expiry (default: 30)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the knowledge base cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("triage_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting symptom triage REST API on {}", addr);

    let cfg = Arc::new(config_from_env()?);
    // The remote fallback uses a blocking client.
    let service = tokio::task::spawn_blocking(move || TriageService::load(cfg)).await??;

    let gate = AccessGate::from_env();
    if gate.is_open() {
        tracing::warn!("TRIAGE_ACCESS_KEY is not set; the questionnaire is open to anyone");
    }

    let state = AppState::new(service, gate).with_idle_timeout(session_idle_timeout_from_env()?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
