use chrono::{DateTime, Local};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned box around a moving region, in analysis-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Per-frame classification result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub detected: bool,
    pub boxes: Vec<BoundingBox>,
}

impl MotionEvent {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_boxes(boxes: Vec<BoundingBox>) -> Self {
        Self {
            detected: !boxes.is_empty(),
            boxes,
        }
    }

    pub fn status_text(&self) -> &'static str {
        if self.detected {
            "motion detected"
        } else {
            "none detected"
        }
    }
}

/// Owned copy of everything the side-effect path needs for one fired event.
#[derive(Debug, Clone)]
pub struct TriggeredEvent {
    pub captured_at: DateTime<Local>,
    pub annotated: RgbImage,
    pub raw: RgbImage,
    pub boxes: Vec<BoundingBox>,
}

/// Paths of the two images persisted for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPair {
    pub annotated_path: PathBuf,
    pub raw_path: PathBuf,
    pub timestamp: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_event_detected_follows_boxes() {
        assert!(!MotionEvent::from_boxes(Vec::new()).detected);
        let event = MotionEvent::from_boxes(vec![BoundingBox::new(1, 2, 3, 4)]);
        assert!(event.detected);
        assert_eq!(event.status_text(), "motion detected");
    }
}
