//! Session pipeline.
//!
//! One [`SessionProcessor`] drives one session directory from `pending` to
//! `done` or `error`:
//!
//! ```text
//! original.webm ─► FrameSource ─► EdgeStage ─► MotionAccumulator ─► render ─► heatmap.webm
//!                                                      │
//!                                                      ▼
//!                                               MotionTimeline ─► analytics.json
//! ```
//!
//! Each processor owns its accumulator, timeline, and device link. Nothing
//! carries over from one session to the next.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use mova_media::motion::{render, MotionAccumulator, MotionTimeline};
use mova_media::{is_nonempty_file, remove_if_exists, write_json_atomic, FrameIo, FrameSink, FrameSource};
use mova_models::{JobStatus, JobUpdate};
use tracing::debug;

use crate::config::SessionConfig;
use crate::edge_stage::{DeviceConnector, EdgeStage};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::scanner::session_id;
use crate::store::{JobStore, JOB_FILE};

/// Input video inside a session directory.
pub const ORIGINAL_VIDEO: &str = "original.webm";
/// Rendered heatmap video.
pub const HEATMAP_VIDEO: &str = "heatmap.webm";
/// Analytics record.
pub const ANALYTICS_FILE: &str = "analytics.json";

/// Artifact paths of one session.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub dir: PathBuf,
    pub job: PathBuf,
    pub original: PathBuf,
    pub heatmap: PathBuf,
    pub analytics: PathBuf,
}

impl SessionPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            job: dir.join(JOB_FILE),
            original: dir.join(ORIGINAL_VIDEO),
            heatmap: dir.join(HEATMAP_VIDEO),
            analytics: dir.join(ANALYTICS_FILE),
            dir,
        }
    }
}

/// Read-only inputs shared by every session the worker runs.
#[derive(Clone)]
pub struct SessionContext {
    pub io: Arc<dyn FrameIo>,
    pub connector: Option<Arc<dyn DeviceConnector>>,
    pub config: SessionConfig,
}

impl SessionContext {
    pub fn new(io: Arc<dyn FrameIo>, config: SessionConfig) -> Self {
        Self {
            io,
            connector: None,
            config,
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn DeviceConnector>) -> Self {
        self.connector = Some(connector);
        self
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub status: JobStatus,
    /// Frames that made it through the whole pipeline
    pub frames: u64,
    pub error: Option<String>,
}

/// Runs one session to a terminal status.
pub struct SessionProcessor<'a> {
    ctx: &'a SessionContext,
    paths: SessionPaths,
    store: JobStore,
    logger: JobLogger,
}

impl<'a> SessionProcessor<'a> {
    pub fn new(ctx: &'a SessionContext, dir: &Path) -> Self {
        let paths = SessionPaths::new(dir);
        Self {
            ctx,
            store: JobStore::new(paths.job.clone()),
            logger: JobLogger::new(&session_id(dir), ctx.config.edge.mode()),
            paths,
        }
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Process the session and record the outcome in `job.json`.
    ///
    /// Pipeline failures become an `error` record and an `Ok` report. An
    /// `Err` means the record itself could not be written.
    pub fn run(self) -> WorkerResult<SessionReport> {
        let span = self.logger.create_span();
        let _enter = span.enter();
        let started = Instant::now();

        self.logger.log_start();

        let mut processed = 0u64;
        let report = match self.process(&mut processed) {
            Ok(()) => SessionReport {
                status: JobStatus::Done,
                frames: processed,
                error: None,
            },
            Err(err) => {
                self.logger.log_failure(&err, processed);
                let message = err.session_failure_message();

                match remove_if_exists(&self.paths.heatmap) {
                    Ok(true) => debug!(path = %self.paths.heatmap.display(), "Partial output removed"),
                    Ok(false) => {}
                    Err(e) => self
                        .logger
                        .log_warning(&format!("could not remove partial output: {e}")),
                }

                self.store.force_update(&JobUpdate::error(message.clone()))?;
                SessionReport {
                    status: JobStatus::Error,
                    frames: processed,
                    error: Some(message),
                }
            }
        };

        metrics::record_session(report.status, started.elapsed().as_secs_f64());
        Ok(report)
    }

    fn process(&self, processed: &mut u64) -> WorkerResult<()> {
        let config = &self.ctx.config;

        if !self.paths.original.is_file() {
            return Err(WorkerError::InputNotFound(self.paths.original.clone()));
        }

        let mut edge = EdgeStage::open(&config.edge, self.ctx.connector.as_ref())?;
        if let (Some(link), Some(device)) = (edge.link_description(), edge.device_resolution()) {
            self.logger.log_device_link(link, device.width, device.height);
        }

        let mut source = self.ctx.io.open_source(&self.paths.original)?;
        let info = source.info().clone();
        let fps = info.effective_fps();
        let total = match info.known_frame_count() {
            Some(count) => count,
            None => {
                self.logger
                    .log_warning("container has no frame count, counting by decoding");
                self.ctx.io.count_frames(&self.paths.original)?
            }
        };

        self.store.update(&JobUpdate::processing(total))?;
        self.logger.log_stream(info.width, info.height, fps, total);

        let mut sink = self
            .ctx
            .io
            .create_sink(&self.paths.heatmap, info.width, info.height, fps)
            .map_err(|e| WorkerError::output_failed(e.to_string()))?;

        let mut accumulator = MotionAccumulator::new(info.width, info.height, config.accumulator);
        let mut timeline = MotionTimeline::new(fps, config.analysis);

        let streamed = self.stream_frames(
            source.as_mut(),
            sink.as_mut(),
            &mut edge,
            &mut accumulator,
            &mut timeline,
            total,
            processed,
        );
        edge.close();

        if let Err(err) = streamed {
            if let Err(e) = source.close() {
                self.logger
                    .log_warning(&format!("decoder did not exit cleanly after failure: {e}"));
            }
            if let Err(e) = sink.close() {
                self.logger
                    .log_warning(&format!("encoder did not exit cleanly after failure: {e}"));
            }
            return Err(err);
        }

        if let Err(e) = source.close() {
            self.logger
                .log_warning(&format!("decoder did not exit cleanly: {e}"));
        }
        sink.close()?;

        let analytics = timeline.finish(&accumulator, edge.device_resolution());
        write_json_atomic(&self.paths.analytics, &analytics)?;

        if !is_nonempty_file(&self.paths.heatmap) {
            return Err(WorkerError::OutputEmpty);
        }

        self.store.update(&JobUpdate::done(*processed))?;
        self.logger.log_completion(
            *processed,
            analytics.intensity.peak,
            analytics.intensity.peak_frame,
        );
        Ok(())
    }

    /// Push every frame through edge, accumulate, sample, and render.
    fn stream_frames(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        edge: &mut EdgeStage,
        accumulator: &mut MotionAccumulator,
        timeline: &mut MotionTimeline,
        total: u64,
        processed: &mut u64,
    ) -> WorkerResult<()> {
        let every = self.ctx.config.progress_every.max(1);

        while let Some(frame) = source.next_frame()? {
            let index = *processed;

            let edges = edge.edges(&frame, index)?;
            accumulator.ingest(&edges)?;
            timeline.observe(index, accumulator);
            sink.write_frame(&render(accumulator.heatmap()))?;

            *processed += 1;
            metrics::record_frames_processed(1);

            if *processed % every == 0 {
                self.store.update(&JobUpdate::progress(*processed))?;
                self.logger.log_frame_progress(index, *processed, total);
            }
        }

        Ok(())
    }
}

/// Run the session in `dir` with a fresh processor.
pub fn run_session(ctx: &SessionContext, dir: &Path) -> WorkerResult<SessionReport> {
    SessionProcessor::new(ctx, dir).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_paths() {
        let paths = SessionPaths::new("/data/sessions/abc");
        assert_eq!(paths.job, PathBuf::from("/data/sessions/abc/job.json"));
        assert_eq!(paths.original, PathBuf::from("/data/sessions/abc/original.webm"));
        assert_eq!(paths.heatmap, PathBuf::from("/data/sessions/abc/heatmap.webm"));
        assert_eq!(paths.analytics, PathBuf::from("/data/sessions/abc/analytics.json"));
    }
}
