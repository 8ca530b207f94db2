use serde::Serialize;
use std::sync::Mutex;

/// Run counters, shared between the frame loop and the event worker.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames: usize,
    pub warmup_frames: usize,
    pub motion_frames: usize,
    pub events: usize,
    pub snapshots_written: usize,
    pub snapshot_failures: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_frame(&self, motion: bool) {
        self.update(|m| {
            m.frames += 1;
            if motion {
                m.motion_frames += 1;
            }
        });
    }

    pub fn record_warmup(&self) {
        self.update(|m| {
            m.frames += 1;
            m.warmup_frames += 1;
        });
    }

    pub fn record_event(&self) {
        self.update(|m| m.events += 1);
    }

    pub fn record_snapshot(&self, written: bool) {
        self.update(|m| {
            if written {
                m.snapshots_written += 1;
            } else {
                m.snapshot_failures += 1;
            }
        });
    }

    pub fn record_notification(&self, sent: bool) {
        self.update(|m| {
            if sent {
                m.notifications_sent += 1;
            } else {
                m.notification_failures += 1;
            }
        });
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
