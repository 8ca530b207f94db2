use crate::imaging::{extract_regions, Region};
use crate::interface::MotionEvent;
use crate::prelude::{PipelineConfig, ProcessingStage, StageResult};
use crate::processing::background::BackgroundModel;
use crate::telemetry::log::LogManager;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

/// Analysis frame paired with the (already updated) background it is compared against.
pub struct Comparison<'a> {
    pub frame: &'a GrayImage,
    pub background: &'a BackgroundModel,
}

/// Frame differencing, thresholding and region filtering.
pub struct MotionClassifier {
    delta_thresh: u8,
    dilate_iterations: u8,
    min_area: f64,
    logger: LogManager,
}

impl MotionClassifier {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            delta_thresh: config.delta_thresh,
            dilate_iterations: config.dilate_iterations,
            min_area: config.min_area,
            logger: LogManager::new("classifier"),
        }
    }

    /// Binary mask of pixels whose difference from the background exceeds the threshold.
    pub fn threshold_mask(&self, frame: &GrayImage, background: &GrayImage) -> GrayImage {
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let delta = frame.get_pixel(x, y).0[0].abs_diff(background.get_pixel(x, y).0[0]);
            if delta > self.delta_thresh {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// 3x3 dilation repeated `dilate_iterations` times.
    pub fn dilate_mask(&self, mask: GrayImage) -> GrayImage {
        (0..self.dilate_iterations).fold(mask, |acc, _| dilate(&acc, Norm::LInf, 1))
    }

    pub fn qualifying_regions(&self, mask: &GrayImage) -> Vec<Region> {
        extract_regions(mask)
            .into_iter()
            .filter(|region| region.meets_min_area(self.min_area))
            .collect()
    }
}

impl<'a> ProcessingStage<Comparison<'a>> for MotionClassifier {
    type Output = MotionEvent;

    fn execute(&mut self, input: Comparison<'a>) -> StageResult<MotionEvent> {
        input.background.check_dimensions(input.frame)?;

        let background = input.background.to_gray();
        let mask = self.dilate_mask(self.threshold_mask(input.frame, &background));
        let regions = self.qualifying_regions(&mask);

        for region in &regions {
            self.logger
                .detail(&format!("contour area: {:.1}", region.area()));
        }

        Ok(MotionEvent::from_boxes(
            regions.iter().map(Region::bounding_box).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::BoundingBox;

    fn config(min_area: f64) -> PipelineConfig {
        PipelineConfig {
            delta_thresh: 5,
            dilate_iterations: 2,
            min_area,
            ..Default::default()
        }
    }

    fn with_block(width: u32, height: u32, x0: u32, y0: u32, w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if x >= x0 && x < x0 + w && y >= y0 && y < y0 + h {
                Luma([220])
            } else {
                Luma([20])
            }
        })
    }

    #[test]
    fn identical_frames_report_no_motion() {
        let frame = GrayImage::from_pixel(40, 30, Luma([50]));
        let background = BackgroundModel::seed(&frame, 0.5);
        let mut classifier = MotionClassifier::new(&config(10.0));
        let event = classifier
            .execute(Comparison {
                frame: &frame,
                background: &background,
            })
            .unwrap();
        assert_eq!(event, MotionEvent::none());
    }

    #[test]
    fn differences_at_threshold_are_ignored() {
        let classifier = MotionClassifier::new(&config(0.0));
        let frame = GrayImage::from_pixel(4, 4, Luma([105]));
        let at = GrayImage::from_pixel(4, 4, Luma([100]));
        let above = GrayImage::from_pixel(4, 4, Luma([99]));
        assert!(classifier.threshold_mask(&frame, &at).pixels().all(|p| p.0[0] == 0));
        assert!(classifier
            .threshold_mask(&frame, &above)
            .pixels()
            .all(|p| p.0[0] == 255));
    }

    #[test]
    fn dilation_grows_mask_by_two_pixels() {
        let classifier = MotionClassifier::new(&config(0.0));
        let mut mask = GrayImage::new(11, 11);
        mask.put_pixel(5, 5, Luma([255]));
        let dilated = classifier.dilate_mask(mask);
        let lit = dilated.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(lit, 25);
        assert_eq!(dilated.get_pixel(3, 3).0[0], 255);
        assert_eq!(dilated.get_pixel(2, 5).0[0], 0);
    }

    #[test]
    fn new_object_is_boxed() {
        let empty = GrayImage::from_pixel(80, 60, Luma([20]));
        let background = BackgroundModel::seed(&empty, 0.5);
        let frame = with_block(80, 60, 30, 20, 10, 10);
        let mut classifier = MotionClassifier::new(&config(50.0));

        let event = classifier
            .execute(Comparison {
                frame: &frame,
                background: &background,
            })
            .unwrap();
        assert!(event.detected);
        // The 10x10 block grows by two pixels on every side after dilation.
        assert_eq!(event.boxes, vec![BoundingBox::new(28, 18, 14, 14)]);
    }

    #[test]
    fn object_entering_from_any_edge_is_boxed() {
        let empty = GrayImage::from_pixel(60, 60, Luma([20]));
        let background = BackgroundModel::seed(&empty, 0.5);
        let mut classifier = MotionClassifier::new(&config(50.0));

        // Blocks are 30x30; dilation grows them by two pixels except where clipped.
        let cases = [
            ((0, 15), BoundingBox::new(0, 13, 32, 34)),
            ((15, 0), BoundingBox::new(13, 0, 34, 32)),
            ((30, 15), BoundingBox::new(28, 13, 32, 34)),
            ((15, 30), BoundingBox::new(13, 28, 34, 32)),
        ];
        for ((x0, y0), expected) in cases {
            let frame = with_block(60, 60, x0, y0, 30, 30);
            let event = classifier
                .execute(Comparison {
                    frame: &frame,
                    background: &background,
                })
                .unwrap();
            assert!(event.detected, "block at ({x0},{y0})");
            assert_eq!(event.boxes, vec![expected]);
        }
    }

    #[test]
    fn min_area_comparison_is_inclusive() {
        // A 10x10 block dilates to 14x14, whose border encloses 13 * 13 = 169.
        let empty = GrayImage::from_pixel(60, 60, Luma([20]));
        let background = BackgroundModel::seed(&empty, 0.5);
        let frame = with_block(60, 60, 20, 20, 10, 10);
        let comparison = || Comparison {
            frame: &frame,
            background: &background,
        };

        let mut at_boundary = MotionClassifier::new(&config(169.0));
        assert!(at_boundary.execute(comparison()).unwrap().detected);

        let mut above_boundary = MotionClassifier::new(&config(170.0));
        assert!(!above_boundary.execute(comparison()).unwrap().detected);
    }

    #[test]
    fn each_region_gets_its_own_box() {
        let empty = GrayImage::from_pixel(100, 40, Luma([20]));
        let background = BackgroundModel::seed(&empty, 0.5);
        let mut frame = with_block(100, 40, 5, 5, 10, 10);
        for y in 20..30 {
            for x in 70..85 {
                frame.put_pixel(x, y, Luma([220]));
            }
        }
        let mut classifier = MotionClassifier::new(&config(50.0));
        let event = classifier
            .execute(Comparison {
                frame: &frame,
                background: &background,
            })
            .unwrap();
        assert_eq!(event.boxes.len(), 2);
    }

    #[test]
    fn small_regions_are_discarded() {
        let empty = GrayImage::from_pixel(40, 40, Luma([20]));
        let background = BackgroundModel::seed(&empty, 0.5);
        let frame = with_block(40, 40, 10, 10, 2, 2);
        let mut classifier = MotionClassifier::new(&config(500.0));
        let event = classifier
            .execute(Comparison {
                frame: &frame,
                background: &background,
            })
            .unwrap();
        assert!(!event.detected);
        assert!(event.boxes.is_empty());
    }
}
