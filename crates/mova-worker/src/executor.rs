//! Session executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mova_media::FfmpegIo;
use mova_models::{JobStatus, JobUpdate};
use tracing::{debug, error, info, warn};

use crate::config::{EdgeMode, WorkerConfig};
use crate::edge_stage::SerialConnector;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::scanner::{find_pending_sessions, session_id};
use crate::session::{run_session, SessionContext, SessionReport};
use crate::store::JobStore;

/// Polls the sessions directory and processes pending sessions one at a time.
pub struct JobExecutor {
    config: WorkerConfig,
    ctx: Arc<SessionContext>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl JobExecutor {
    /// Create an executor backed by FFmpeg and, in device mode, the serial link.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let io = FfmpegIo::new()
            .with_encoder(config.encoder.clone())
            .with_log_level(config.ffmpeg_log_level.as_str());
        let mut ctx = SessionContext::new(Arc::new(io), config.session_config()?);
        if config.edge_mode == EdgeMode::Device {
            ctx = ctx.with_connector(Arc::new(SerialConnector));
        }
        Ok(Self::with_context(config, ctx))
    }

    /// Create an executor with explicit frame I/O and device access.
    pub fn with_context(config: WorkerConfig, ctx: SessionContext) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            config,
            ctx: Arc::new(ctx),
            shutdown,
        }
    }

    /// Start the executor. Returns after [`shutdown`](Self::shutdown).
    ///
    /// A session that is already running finishes before the loop exits.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            sessions_dir = %self.config.sessions_dir.display(),
            edge_mode = %self.config.edge_mode,
            poll_secs = self.config.poll_interval.as_secs_f64(),
            "Starting session executor"
        );

        tokio::fs::create_dir_all(&self.config.sessions_dir).await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.poll_once().await {
                Ok(reports) if !reports.is_empty() => {
                    let failed = reports
                        .iter()
                        .filter(|r| r.status == JobStatus::Error)
                        .count();
                    info!(processed = reports.len(), failed, "Poll cycle finished");
                }
                Ok(_) => {}
                Err(e) => error!("Error polling sessions: {}", e),
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Session executor stopped");
        Ok(())
    }

    /// Scan once and process every pending session in order.
    ///
    /// Stops early, between sessions, when shutdown was requested.
    pub async fn poll_once(&self) -> WorkerResult<Vec<SessionReport>> {
        let root = self.config.sessions_dir.clone();
        let pending = tokio::task::spawn_blocking(move || find_pending_sessions(&root))
            .await
            .map_err(|e| WorkerError::processing_failed(format!("scan task failed: {e}")))??;

        metrics::set_pending_sessions(pending.len());
        if pending.is_empty() {
            debug!("No pending sessions");
            return Ok(Vec::new());
        }
        info!(count = pending.len(), "Found pending sessions");

        let mut reports = Vec::with_capacity(pending.len());
        for dir in pending {
            if *self.shutdown.borrow() {
                info!("Shutdown requested, leaving remaining sessions pending");
                break;
            }

            match self.execute_session(dir).await {
                Ok(report) => reports.push(report),
                Err(e) => error!("Session failed without a recorded outcome: {}", e),
            }
        }

        Ok(reports)
    }

    /// Run one session on the blocking pool.
    async fn execute_session(&self, dir: PathBuf) -> WorkerResult<SessionReport> {
        let ctx = Arc::clone(&self.ctx);
        let task_dir = dir.clone();

        match tokio::task::spawn_blocking(move || run_session(&ctx, &task_dir)).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => {
                Self::mark_failed(&dir, &e.session_failure_message());
                Err(e)
            }
            Err(join_error) => {
                let message = format!("Session worker crashed: {join_error}");
                Self::mark_failed(&dir, &message);
                Err(WorkerError::processing_failed(message))
            }
        }
    }

    /// Last-resort error record for a session whose pipeline did not finish.
    ///
    /// A record that already reached `done` or `error` is left alone.
    pub(crate) fn mark_failed(dir: &Path, message: &str) {
        let store = JobStore::for_session(dir);
        if let Ok(record) = store.load() {
            if record.is_terminal() {
                warn!(
                    session = %session_id(dir),
                    status = %record.status.as_str(),
                    "Session already finished, not overwriting: {}", message
                );
                return;
            }
        }
        match store.force_update(&JobUpdate::error(message)) {
            Ok(_) => warn!(session = %session_id(dir), "Marked session as failed: {}", message),
            Err(e) => error!(
                session = %session_id(dir),
                "Could not record failure ({}): {}", message, e
            ),
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}
