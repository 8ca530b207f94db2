use crate::prelude::{StageError, StageResult};
use image::GrayImage;
use ndarray::{Array2, Zip};

/// Exponentially weighted running average of the analysis frames.
///
/// The model is updated on every frame regardless of detection, so an object
/// that stays in view is gradually absorbed into the background.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    accumulator: Array2<f32>,
    alpha: f32,
}

impl BackgroundModel {
    /// Seeds the model from the first analysis frame.
    pub fn seed(frame: &GrayImage, alpha: f32) -> Self {
        Self {
            accumulator: to_array(frame),
            alpha,
        }
    }

    /// `model = alpha * frame + (1 - alpha) * model`
    pub fn update(&mut self, frame: &GrayImage) -> StageResult<()> {
        self.check_dimensions(frame)?;
        let alpha = self.alpha;
        Zip::from(&mut self.accumulator)
            .and(&to_array(frame))
            .for_each(|bg, &value| {
                *bg = alpha * value + (1.0 - alpha) * *bg;
            });
        Ok(())
    }

    /// `(width, height)` of the model.
    pub fn dimensions(&self) -> (u32, u32) {
        let (rows, cols) = self.accumulator.dim();
        (cols as u32, rows as u32)
    }

    pub fn check_dimensions(&self, frame: &GrayImage) -> StageResult<()> {
        if frame.dimensions() != self.dimensions() {
            let (w, h) = self.dimensions();
            return Err(StageError::InvalidFrame(format!(
                "frame is {}x{} but the background model is {}x{}",
                frame.width(),
                frame.height(),
                w,
                h
            )));
        }
        Ok(())
    }

    pub fn value(&self, x: u32, y: u32) -> Option<f32> {
        self.accumulator.get((y as usize, x as usize)).copied()
    }

    /// Model rounded and saturated to 8-bit pixels.
    pub fn to_gray(&self) -> GrayImage {
        let (width, height) = self.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let value = self.accumulator[(y as usize, x as usize)];
            image::Luma([value.abs().round().min(255.0) as u8])
        })
    }
}

fn to_array(frame: &GrayImage) -> Array2<f32> {
    let (width, height) = frame.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        frame.get_pixel(col as u32, row as u32).0[0] as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ramp(width: u32, height: u32, offset: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 7 + y * 13) as u8).wrapping_add(offset)])
        })
    }

    #[test]
    fn seed_copies_frame() {
        let frame = ramp(8, 6, 0);
        let model = BackgroundModel::seed(&frame, 0.5);
        assert_eq!(model.dimensions(), (8, 6));
        assert_eq!(model.value(3, 2), Some(frame.get_pixel(3, 2).0[0] as f32));
    }

    #[test]
    fn update_is_weighted_average_of_seed_and_frame() {
        let f0 = ramp(8, 6, 0);
        let f1 = ramp(8, 6, 40);
        let mut model = BackgroundModel::seed(&f0, 0.5);
        model.update(&f1).unwrap();

        for (x, y, p1) in f1.enumerate_pixels() {
            let p0 = f0.get_pixel(x, y).0[0] as f32;
            let expected = 0.5 * p1.0[0] as f32 + 0.5 * p0;
            let actual = model.value(x, y).unwrap();
            assert!((actual - expected).abs() < 1e-4, "({x},{y}) {actual} != {expected}");
        }
    }

    #[test]
    fn static_scene_keeps_model_unchanged() {
        let frame = ramp(5, 5, 3);
        let mut model = BackgroundModel::seed(&frame, 0.5);
        for _ in 0..10 {
            model.update(&frame).unwrap();
        }
        assert_eq!(model.to_gray(), frame);
    }

    #[test]
    fn persistent_object_is_absorbed() {
        let empty = GrayImage::from_pixel(4, 4, Luma([10]));
        let occupied = GrayImage::from_pixel(4, 4, Luma([200]));
        let mut model = BackgroundModel::seed(&empty, 0.5);
        for _ in 0..20 {
            model.update(&occupied).unwrap();
        }
        assert!((model.value(0, 0).unwrap() - 200.0).abs() < 0.01);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut model = BackgroundModel::seed(&ramp(8, 6, 0), 0.5);
        let err = model.update(&ramp(6, 8, 0)).unwrap_err();
        assert!(matches!(err, StageError::InvalidFrame(_)));
    }
}
