use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Counter-clockwise rotation applied to every raw frame to undo the camera mounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    None,
    Ccw90,
    Ccw180,
    Ccw270,
}

impl TryFrom<u16> for Rotation {
    type Error = StageError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Ccw90),
            180 => Ok(Rotation::Ccw180),
            270 => Ok(Rotation::Ccw270),
            other => Err(StageError::InvalidConfig(format!(
                "rotation must be one of 0, 90, 180, 270 (got {})",
                other
            ))),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::None => 0,
            Rotation::Ccw90 => 90,
            Rotation::Ccw180 => 180,
            Rotation::Ccw270 => 270,
        }
    }
}

impl Rotation {
    /// Whether the rotation swaps width and height.
    pub fn is_transposing(self) -> bool {
        matches!(self, Rotation::Ccw90 | Rotation::Ccw270)
    }
}

/// Static parameters shared by every stage of the pipeline for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw frame size delivered by the frame source, `(width, height)`.
    pub resolution: (u32, u32),
    pub rotation: Rotation,
    /// Skip the downscale step when set.
    pub hd: bool,
    pub resize_width: u32,
    pub blur_kernel: u32,
    pub alpha: f32,
    pub delta_thresh: u8,
    pub dilate_iterations: u8,
    pub min_area: f64,
    /// Cooldown between events, compared against whole elapsed seconds.
    pub min_upload_seconds: f64,
    pub min_motion_frames: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: (640, 480),
            rotation: Rotation::Ccw270,
            hd: false,
            resize_width: 500,
            blur_kernel: 21,
            alpha: 0.5,
            delta_thresh: 5,
            dilate_iterations: 2,
            min_area: 5000.0,
            min_upload_seconds: 3.0,
            min_motion_frames: 8,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> StageResult<()> {
        let (width, height) = self.resolution;
        if width == 0 || height == 0 {
            return Err(StageError::InvalidConfig(format!(
                "resolution must be non-zero (got {}x{})",
                width, height
            )));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(StageError::InvalidConfig(format!(
                "blur_kernel must be odd and positive (got {})",
                self.blur_kernel
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(StageError::InvalidConfig(format!(
                "alpha must lie in (0, 1] (got {})",
                self.alpha
            )));
        }
        if self.min_motion_frames == 0 {
            return Err(StageError::InvalidConfig(
                "min_motion_frames must be at least 1".into(),
            ));
        }
        if !self.hd && self.resize_width == 0 {
            return Err(StageError::InvalidConfig(
                "resize_width must be non-zero".into(),
            ));
        }
        if !self.min_upload_seconds.is_finite() || self.min_upload_seconds < 0.0 {
            return Err(StageError::InvalidConfig(format!(
                "min_upload_seconds must be a non-negative number (got {})",
                self.min_upload_seconds
            )));
        }
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(StageError::InvalidConfig(format!(
                "min_area must be a non-negative number (got {})",
                self.min_area
            )));
        }
        Ok(())
    }

    /// Dimensions of the analysis frame produced from a raw frame of `resolution`.
    pub fn analysis_dimensions(&self) -> (u32, u32) {
        let (width, height) = if self.rotation.is_transposing() {
            (self.resolution.1, self.resolution.0)
        } else {
            self.resolution
        };
        if self.hd || width == self.resize_width {
            (width, height)
        } else {
            let ratio = self.resize_width as f64 / width as f64;
            (self.resize_width, ((height as f64 * ratio) as u32).max(1))
        }
    }
}

/// Common error type for pipeline execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("frame acquisition failed: {0}")]
    FrameAcquisition(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("failed to persist snapshot {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },
    #[error("notification failed: {0}")]
    Notification(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StageError {
    /// Errors on the per-frame hot path end the run; side-effect errors do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StageError::FrameAcquisition(_)
                | StageError::InvalidFrame(_)
                | StageError::InvalidConfig(_)
        )
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// A single step of the per-frame pipeline.
pub trait ProcessingStage<Input> {
    type Output;

    fn execute(&mut self, input: Input) -> StageResult<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn even_blur_kernel_is_rejected() {
        let config = PipelineConfig {
            blur_kernel: 20,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rotation_rejects_unsupported_angles() {
        assert_eq!(Rotation::try_from(270).unwrap(), Rotation::Ccw270);
        assert!(Rotation::try_from(45).is_err());
    }

    #[test]
    fn analysis_dimensions_follow_rotation_and_resize() {
        let config = PipelineConfig {
            resolution: (640, 480),
            rotation: Rotation::Ccw270,
            hd: false,
            resize_width: 240,
            ..Default::default()
        };
        assert_eq!(config.analysis_dimensions(), (240, 320));

        let hd = PipelineConfig {
            hd: true,
            ..config
        };
        assert_eq!(hd.analysis_dimensions(), (480, 640));
    }

    #[test]
    fn side_effect_errors_are_not_fatal() {
        let err = StageError::Notification("smtp down".into());
        assert!(!err.is_fatal());
        assert!(StageError::InvalidFrame("3x3".into()).is_fatal());
    }
}
