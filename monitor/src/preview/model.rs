use chrono::{DateTime, Local};
use motioncore::interface::{BoundingBox, SnapshotPair};
use motioncore::processing::CycleReport;
use motioncore::telemetry::MetricsSnapshot;
use serde::Serialize;

/// What `GET /status` reports about the most recent processed frame.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewModel {
    pub status: String,
    pub captured_at: Option<DateTime<Local>>,
    pub boxes: Vec<BoundingBox>,
    pub metrics: MetricsSnapshot,
    pub last_snapshot: Option<SnapshotPair>,
}

impl Default for PreviewModel {
    fn default() -> Self {
        Self {
            status: "starting".into(),
            captured_at: None,
            boxes: Vec::new(),
            metrics: MetricsSnapshot::default(),
            last_snapshot: None,
        }
    }
}

impl PreviewModel {
    pub fn from_report(
        report: &CycleReport,
        metrics: MetricsSnapshot,
        last_snapshot: Option<SnapshotPair>,
    ) -> Self {
        Self {
            status: report.motion.status_text().to_string(),
            captured_at: Some(report.captured_at),
            boxes: report.motion.boxes.clone(),
            metrics,
            last_snapshot,
        }
    }
}
