use crate::imaging::Overlay;
use crate::interface::{Frame, MotionEvent, TriggeredEvent};
use crate::prelude::{PipelineConfig, ProcessingStage, StageResult};
use crate::processing::background::BackgroundModel;
use crate::processing::classifier::{Comparison, MotionClassifier};
use crate::processing::debounce::{DebounceDecision, DebounceState, EventDebouncer};
use crate::processing::preprocess::Preprocessor;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::sync::Arc;

/// Everything that persists across frames. Owned by the frame loop only.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub background: Option<BackgroundModel>,
    pub debounce: DebounceState,
}

impl PipelineState {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            background: None,
            debounce: DebounceState::new(started_at),
        }
    }
}

/// Result of one processed frame after warm-up.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub captured_at: DateTime<Local>,
    pub motion: MotionEvent,
    pub decision: DebounceDecision,
    pub annotated: RgbImage,
    pub triggered: Option<TriggeredEvent>,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The frame seeded the background model and was not classified.
    WarmUp,
    Processed(CycleReport),
}

/// Preprocess -> background update -> classify -> debounce, one frame at a time.
pub struct MotionPipeline {
    preprocessor: Preprocessor,
    classifier: MotionClassifier,
    debouncer: EventDebouncer,
    overlay: Overlay,
    alpha: f32,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl MotionPipeline {
    pub fn new(config: &PipelineConfig, metrics: Arc<MetricsRecorder>) -> StageResult<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor: Preprocessor::new(config),
            classifier: MotionClassifier::new(config),
            debouncer: EventDebouncer::new(config),
            overlay: Overlay::new(),
            alpha: config.alpha,
            metrics,
            logger: LogManager::new("pipeline"),
        })
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub fn process(
        &mut self,
        state: &mut PipelineState,
        frame: Frame,
    ) -> StageResult<CycleOutcome> {
        let prepared = self.preprocessor.execute(frame)?;

        let background = match state.background.as_mut() {
            Some(background) => background,
            None => {
                self.logger.record("starting background model...");
                state.background = Some(BackgroundModel::seed(&prepared.analysis, self.alpha));
                self.metrics.record_warmup();
                return Ok(CycleOutcome::WarmUp);
            }
        };

        background.update(&prepared.analysis)?;
        let motion = self.classifier.execute(Comparison {
            frame: &prepared.analysis,
            background,
        })?;
        self.metrics.record_frame(motion.detected);

        let mut annotated = prepared.display.clone();
        self.overlay
            .annotate(&mut annotated, &motion.boxes, &prepared.captured_at);

        let decision = self
            .debouncer
            .observe(&mut state.debounce, motion.detected, prepared.captured_at);
        if motion.detected {
            self.logger.detail(&format!(
                "motion detected ({} regions, {:?})",
                motion.boxes.len(),
                decision
            ));
        }

        let triggered = if decision.fired() {
            self.metrics.record_event();
            self.logger.record(&format!(
                "motion event at {}",
                prepared.captured_at.format("%Y-%m-%d %H:%M:%S")
            ));
            Some(TriggeredEvent {
                captured_at: prepared.captured_at,
                annotated: annotated.clone(),
                raw: prepared.display,
                boxes: motion.boxes.clone(),
            })
        } else {
            None
        };

        Ok(CycleOutcome::Processed(CycleReport {
            captured_at: prepared.captured_at,
            motion,
            decision,
            annotated,
            triggered,
        }))
    }
}
