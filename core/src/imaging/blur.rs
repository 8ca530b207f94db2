use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Separable Gaussian blur with a fixed square kernel.
///
/// The sigma is derived from the kernel size with the usual
/// `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule. Both passes run in `f32` and the
/// result is rounded once, so flat areas keep their exact value.
pub struct GaussianBlur {
    kernel: Vec<f32>,
}

impl GaussianBlur {
    pub fn new(size: u32) -> Self {
        Self {
            kernel: Self::kernel(size.max(1)),
        }
    }

    pub fn sigma_for(size: u32) -> f32 {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    fn kernel(size: u32) -> Vec<f32> {
        let sigma = Self::sigma_for(size);
        let center = (size as f32 - 1.0) / 2.0;
        let weights: Vec<f32> = (0..size)
            .map(|i| {
                let offset = i as f32 - center;
                (-(offset * offset) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel.len()
    }

    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let widened: GrayF32 =
            ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
                Luma([image.get_pixel(x, y).0[0] as f32])
            });
        let blurred = separable_filter_equal(&widened, &self.kernel);
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([blurred.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let blur = GaussianBlur::new(21);
        assert_eq!(blur.kernel_size(), 21);
        let total: f32 = blur.kernel.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!((blur.kernel[0] - blur.kernel[20]).abs() < 1e-7);
        assert!(blur.kernel[10] > blur.kernel[9]);
    }

    #[test]
    fn sigma_matches_kernel_rule() {
        assert!((GaussianBlur::sigma_for(21) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn flat_image_is_unchanged() {
        for value in [0u8, 1, 77, 128, 254, 255] {
            let image = GrayImage::from_pixel(30, 30, Luma([value]));
            let blurred = GaussianBlur::new(21).apply(&image);
            assert_eq!(blurred, image, "flat value {value}");
        }
    }

    #[test]
    fn step_edge_is_smoothed_symmetrically() {
        let image = GrayImage::from_fn(40, 5, |x, _| if x < 20 { Luma([0]) } else { Luma([200]) });
        let blurred = GaussianBlur::new(5).apply(&image);
        let left = blurred.get_pixel(19, 2).0[0] as i16;
        let right = blurred.get_pixel(20, 2).0[0] as i16;
        assert!(left > 0 && right < 200);
        assert!((left + right - 200).abs() <= 1);
        assert_eq!(blurred.get_pixel(0, 2).0[0], 0);
        assert_eq!(blurred.get_pixel(39, 2).0[0], 200);
    }

    #[test]
    fn single_bright_pixel_is_spread() {
        let mut image = GrayImage::new(31, 31);
        image.put_pixel(15, 15, Luma([255]));
        let blurred = GaussianBlur::new(5).apply(&image);
        assert!(blurred.get_pixel(15, 15).0[0] < 255);
        assert!(blurred.get_pixel(16, 15).0[0] > 0);
    }
}
