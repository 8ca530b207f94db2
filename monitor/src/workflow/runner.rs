use crate::preview::{PreviewModel, PreviewSink};
use anyhow::Context;
use chrono::{DateTime, Local};
use motioncore::interface::{FrameSource, SnapshotPair};
use motioncore::output::EventSink;
use motioncore::telemetry::{LogManager, MetricsSnapshot};
use motioncore::{CycleOutcome, MotionPipeline, PipelineState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// When the warm-up ended and the cooldown clock started.
    pub started_at: DateTime<Local>,
    pub frames: usize,
    /// The loop ended because the stop flag was raised.
    pub stopped: bool,
    pub metrics: MetricsSnapshot,
    /// Last pair written on the loop thread (inline event handling only).
    pub last_snapshot: Option<SnapshotPair>,
}

/// Owns the frame loop: pulls frames, runs the pipeline, hands fired events
/// to the sink and feeds the previews.
pub struct Runner {
    pipeline: MotionPipeline,
    sink: EventSink,
    previews: Vec<Box<dyn PreviewSink>>,
    stop: Arc<AtomicBool>,
    warmup: Duration,
    max_frames: Option<usize>,
    logger: LogManager,
}

impl Runner {
    pub fn new(pipeline: MotionPipeline, sink: EventSink, stop: Arc<AtomicBool>) -> Self {
        Self {
            pipeline,
            sink,
            previews: Vec::new(),
            stop,
            warmup: Duration::ZERO,
            max_frames: None,
            logger: LogManager::new("monitor"),
        }
    }

    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.previews.push(preview);
        self
    }

    /// Camera settle time waited out before the first frame is read.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Runs until the source ends, the stop flag is raised, or `max_frames`
    /// frames have been read. Queued events are drained before returning,
    /// including when a frame error ends the run.
    pub fn run<S: FrameSource>(mut self, source: &mut S) -> anyhow::Result<RunSummary> {
        if !self.warmup.is_zero() {
            self.logger.record("warming up...");
            thread::sleep(self.warmup);
        }
        // The cooldown is measured from here, not from process start.
        let started_at = Local::now();
        let mut state = PipelineState::new(started_at);

        let outcome = self.drive(&mut state, source);
        let Runner {
            pipeline,
            sink,
            logger,
            ..
        } = self;
        sink.shutdown();

        let (frames, stopped, last_snapshot) = outcome?;
        let metrics = pipeline.metrics().snapshot();
        logger.record(&format!(
            "run finished after {} frames: {} motion frames, {} events, {} snapshots ({} failed), {} notifications ({} failed)",
            frames,
            metrics.motion_frames,
            metrics.events,
            metrics.snapshots_written,
            metrics.snapshot_failures,
            metrics.notifications_sent,
            metrics.notification_failures
        ));
        Ok(RunSummary {
            started_at,
            frames,
            stopped,
            metrics,
            last_snapshot,
        })
    }

    fn drive<S: FrameSource>(
        &mut self,
        state: &mut PipelineState,
        source: &mut S,
    ) -> anyhow::Result<(usize, bool, Option<SnapshotPair>)> {
        let mut frames = 0usize;
        let mut last_snapshot = None;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                self.logger.record("stop requested, leaving frame loop");
                return Ok((frames, true, last_snapshot));
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break;
            }

            let Some(frame) = source
                .next_frame()
                .with_context(|| format!("reading frame {}", frames))?
            else {
                self.logger.record("frame source exhausted");
                break;
            };
            frames += 1;

            let outcome = self
                .pipeline
                .process(state, frame)
                .with_context(|| format!("processing frame {}", frames))?;
            let mut report = match outcome {
                CycleOutcome::WarmUp => continue,
                CycleOutcome::Processed(report) => report,
            };

            if let Some(event) = report.triggered.take() {
                if let Some(pair) = self.sink.submit(event) {
                    last_snapshot = Some(pair);
                }
            }

            for preview in self.previews.iter_mut() {
                let model = PreviewModel::from_report(
                    &report,
                    self.pipeline.metrics().snapshot(),
                    last_snapshot.clone(),
                );
                preview.publish(model, &report.annotated);
            }
        }

        Ok((frames, false, last_snapshot))
    }
}
