use std::sync::Arc;

use tutor_core::config::Config;
use tutor_core::logging;
use tutor_core::state::AppState;
use tutor_core::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config);

    let state = AppState::from_config(&config);

    let worker_manager = match WorkerManager::new(state.orchestrator(), config.clone()).await {
        Ok(manager) => {
            if let Err(e) = manager.start().await {
                tracing::error!(error = %e, "failed to start workers");
            }
            Some(Arc::new(manager))
        }
        Err(e) => {
            tracing::warn!(error = %e, "worker manager not initialized");
            None
        }
    };

    tracing::info!(
        session_max_age_hours = config.session_max_age_hours,
        cleanup_schedule = %config.session_cleanup_schedule,
        "tutor-core maintenance host running"
    );

    shutdown_signal().await;

    tracing::info!(uptime_seconds = state.uptime_seconds(), "shutdown requested");

    if let Some(ref manager) = worker_manager {
        manager.stop().await;
    }

    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
