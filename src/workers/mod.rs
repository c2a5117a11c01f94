mod session_cleanup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::LearningError;
use crate::orchestrator::LearningOrchestrator;

pub use session_cleanup::abandon_expired_sessions;

const MODEL_CLEANUP_SCHEDULE: &str = "0 */10 * * * *";

/// Cron-driven maintenance: the expired-session sweep and stale
/// personalization record eviction.
pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    orchestrator: Arc<LearningOrchestrator>,
    config: Config,
    running: AtomicBool,
}

impl WorkerManager {
    pub async fn new(
        orchestrator: Arc<LearningOrchestrator>,
        config: Config,
    ) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            orchestrator,
            config,
            running: AtomicBool::new(false),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let scheduler = self.scheduler.lock().await;

        if self.config.session_cleanup_enabled {
            let schedule = self.config.session_cleanup_schedule.clone();
            let orchestrator = Arc::clone(&self.orchestrator);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
                let orchestrator = Arc::clone(&orchestrator);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = abandon_expired_sessions(orchestrator) => {
                            if let Err(e) = result {
                                error!(error = %e, "Session cleanup worker error");
                            }
                        }
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(schedule = %schedule, "Session cleanup worker scheduled");
        } else {
            info!("Session cleanup worker disabled");
        }

        {
            let orchestrator = Arc::clone(&self.orchestrator);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let max_idle = self.config.engine_model_max_idle();
            let job = Job::new_async(MODEL_CLEANUP_SCHEDULE, move |_uuid, _lock| {
                let orchestrator = Arc::clone(&orchestrator);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        _ = async {
                            let cleaned = orchestrator.cleanup_stale_models(max_idle).await;
                            if cleaned > 0 {
                                let remaining = orchestrator.engine().model_count().await;
                                info!(cleaned, remaining, "Personalization model cleanup");
                            }
                        } => {}
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!("Personalization model cleanup scheduled (every 10 minutes)");
        }

        scheduler.start().await?;
        self.running.store(true, Ordering::Relaxed);
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("Learning error: {0}")]
    Learning(#[from] LearningError),
}
