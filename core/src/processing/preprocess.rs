use crate::imaging::GaussianBlur;
use crate::interface::Frame;
use crate::prelude::{PipelineConfig, ProcessingStage, Rotation, StageError, StageResult};
use chrono::{DateTime, Local};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

/// Output of the preprocessing stage.
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Rotated and resized color frame, used for annotation and snapshots.
    pub display: RgbImage,
    /// Grayscale, blurred frame used for detection.
    pub analysis: GrayImage,
    pub captured_at: DateTime<Local>,
}

/// Rotates, downsizes, grayscales and blurs raw frames.
pub struct Preprocessor {
    resolution: (u32, u32),
    rotation: Rotation,
    resize_width: Option<u32>,
    blur: GaussianBlur,
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            resolution: config.resolution,
            rotation: config.rotation,
            resize_width: (!config.hd).then_some(config.resize_width),
            blur: GaussianBlur::new(config.blur_kernel),
        }
    }

    fn rotate(&self, image: RgbImage) -> RgbImage {
        // imageops rotates clockwise.
        match self.rotation {
            Rotation::None => image,
            Rotation::Ccw90 => imageops::rotate270(&image),
            Rotation::Ccw180 => imageops::rotate180(&image),
            Rotation::Ccw270 => imageops::rotate90(&image),
        }
    }

    fn resize(&self, image: RgbImage) -> RgbImage {
        let Some(target_width) = self.resize_width else {
            return image;
        };
        let (width, height) = image.dimensions();
        if width == target_width {
            return image;
        }
        let ratio = target_width as f64 / width as f64;
        let target_height = ((height as f64 * ratio) as u32).max(1);
        imageops::resize(&image, target_width, target_height, FilterType::Triangle)
    }
}

impl ProcessingStage<Frame> for Preprocessor {
    type Output = PreparedFrame;

    fn execute(&mut self, frame: Frame) -> StageResult<PreparedFrame> {
        let dimensions = frame.image.dimensions();
        if dimensions != self.resolution {
            return Err(StageError::InvalidFrame(format!(
                "expected {}x{} frame, got {}x{}",
                self.resolution.0, self.resolution.1, dimensions.0, dimensions.1
            )));
        }

        let display = self.resize(self.rotate(frame.image));
        let gray = imageops::grayscale(&display);
        let analysis = self.blur.apply(&gray);

        Ok(PreparedFrame {
            display,
            analysis,
            captured_at: frame.captured_at,
        })
    }
}
