//! Menubar Timer - a countdown progress engine for status-bar timers
//!
//! This is the main entry point for the menubar-timer daemon.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use menubar_timer::{
    config::Config,
    state::AppState,
    api::create_router,
    tasks::completion_notifier_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("menubar_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting menubar-timer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, sample_interval={}ms, presets={:?}",
          config.host, config.port, config.sample_interval_ms, config.presets);

    let engine = config.build_engine()?;
    let state = Arc::new(AppState::new(
        engine,
        config.presets.clone(),
        config.port,
        config.host.clone(),
    ));

    // Deliver completion alerts outside of the engine
    let completions = state.engine.subscribe_lifecycle();
    let notifier = Arc::new(config.notifier());
    info!("Completion alerts: {:?}", notifier);
    tokio::spawn(async move {
        completion_notifier_task(completions, notifier).await;
    });

    if let Some(minutes) = config.start {
        let handle = state.start_minutes(minutes)?;
        info!("Launch timer running for {} minutes (generation {})", minutes, handle.generation());
    }

    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start               - Start a timer ({{\"minutes\": n}} or {{\"seconds\": n}})");
    info!("  POST /start/preset/:index - Start a preset timer");
    info!("  POST /cancel              - Cancel the running timer");
    info!("  GET  /progress            - Current progress");
    info!("  GET  /status              - Timer and server status");
    info!("  GET  /presets             - Preset durations");
    info!("  GET  /events              - Server-sent timer events");
    info!("  GET  /health              - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.engine.cancel();
    info!("Server shutdown complete");
    Ok(())
}
