use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, config_from_env, router, session_idle_timeout_from_env};
use api_shared::AccessGate;
use triage_core::TriageService;

/// Main entry point for the symptom triage service
///
/// Loads `.env`, resolves configuration, loads the knowledge base once and serves the REST API
/// until interrupted.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIAGE_ACCESS_KEY`: access key for the questionnaire routes (unset: open, with a warning)
/// - `TRIAGE_KB_PATH`: knowledge base CSV (default: "data/symptom_kb.csv")
/// - `TRIAGE_KB_URL`: remote CSV used when the local file cannot be loaded
/// - `TRIAGE_FAILURE_LOG`: failure log CSV (default: "triage_failures.csv")
/// - `TRIAGE_MATCH_THRESHOLD`: similarity threshold (default: 0.65)
/// - `TRIAGE_MATCH_STRATEGY`: `anchored` or `phrase` (default: `anchored`)
/// - `TRIAGE_SESSION_IDLE_MINUTES`: sessions idle this long are dropped (default: 30)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, knowledge base loading or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage_run=info".parse()?)
                .add_directive("triage_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env()?);
    tracing::info!(
        "++ Loading knowledge base from {} (strategy {}, threshold {})",
        cfg.kb_path().display(),
        cfg.match_strategy(),
        cfg.match_threshold()
    );
    let service = tokio::task::spawn_blocking(move || TriageService::load(cfg)).await??;

    let gate = AccessGate::from_env();
    if gate.is_open() {
        tracing::warn!("TRIAGE_ACCESS_KEY is not set; the questionnaire is open to anyone");
    }

    tracing::info!("++ Starting symptom triage REST on {}", rest_addr);

    let state = AppState::new(service, gate).with_idle_timeout(session_idle_timeout_from_env()?);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Symptom triage stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
