use crate::interface::BoundingBox;
use crate::prelude::{StageError, StageResult};
use crate::telemetry::log::LogManager;
use ab_glyph::{FontArc, PxScale};
use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::fs;
use std::path::Path;

const BOX_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const TIMESTAMP_FORMAT: &str = "%A %d %B %Y %I:%M:%S%p";
const TEXT_ORIGIN: (i32, i32) = (10, 8);

/// DejaVu Sans Mono, see `assets/DejaVu-LICENSE.txt`.
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// Burns bounding boxes and the capture time into display frames.
pub struct Overlay {
    font: Option<FontArc>,
    scale: PxScale,
}

impl Overlay {
    /// Overlay drawing the timestamp with the bundled font.
    pub fn new() -> Self {
        let font = match FontArc::try_from_slice(BUNDLED_FONT) {
            Ok(font) => Some(font),
            Err(err) => {
                LogManager::new("overlay")
                    .warn(&format!("bundled font unusable, timestamps disabled: {}", err));
                None
            }
        };
        Self {
            font,
            scale: PxScale::from(16.0),
        }
    }

    /// Overlay drawing the timestamp with a TrueType font read from `path`.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| {
            StageError::InvalidConfig(format!("reading font {}: {}", path.display(), err))
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|err| {
            StageError::InvalidConfig(format!("parsing font {}: {}", path.display(), err))
        })?;
        Ok(Self {
            font: Some(font),
            scale: PxScale::from(16.0),
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn timestamp_text(captured_at: &DateTime<Local>) -> String {
        captured_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn annotate(
        &self,
        image: &mut RgbImage,
        boxes: &[BoundingBox],
        captured_at: &DateTime<Local>,
    ) {
        for b in boxes.iter().filter(|b| b.width > 0 && b.height > 0) {
            let rect = Rect::at(b.x as i32, b.y as i32).of_size(b.width, b.height);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let text = Self::timestamp_text(captured_at);
            let (x, y) = TEXT_ORIGIN;
            draw_text_mut(image, TEXT_COLOR, x, y, self.scale, font, &text);
        }
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn changed_pixels(image: &RgbImage) -> usize {
        image.pixels().filter(|p| p.0 != [0, 0, 0]).count()
    }

    #[test]
    fn boxes_are_drawn_as_outlines() {
        let mut image = RgbImage::new(60, 60);
        Overlay::new().annotate(&mut image, &[BoundingBox::new(2, 33, 5, 4)], &Local::now());

        assert_eq!(*image.get_pixel(2, 33), BOX_COLOR);
        assert_eq!(*image.get_pixel(6, 36), BOX_COLOR);
        assert_eq!(*image.get_pixel(4, 34), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(30, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn default_overlay_burns_in_timestamp() {
        let overlay = Overlay::default();
        assert!(overlay.has_font());

        let mut image = RgbImage::new(300, 40);
        overlay.annotate(&mut image, &[], &Local::now());

        let text_area = imageops_crop(&image, 10, 8, 290, 24);
        assert!(changed_pixels(&text_area) > 50);
        assert!(text_area
            .pixels()
            .filter(|p| p.0 != [0, 0, 0])
            .all(|p| p.0[2] == 0 && p.0[0] == p.0[1]));
        // Nothing is drawn outside the text line.
        assert_eq!(changed_pixels(&imageops_crop(&image, 0, 34, 300, 6)), 0);
    }

    #[test]
    fn font_file_override_is_used() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/DejaVuSansMono.ttf");
        let overlay = Overlay::with_font_file(path).unwrap();
        let mut image = RgbImage::new(300, 40);
        overlay.annotate(&mut image, &[], &Local::now());
        assert!(changed_pixels(&image) > 50);
    }

    #[test]
    fn timestamp_uses_long_form() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(Overlay::timestamp_text(&at), "Tuesday 05 March 2024 02:07:09PM");
    }

    #[test]
    fn missing_font_is_a_config_error() {
        let err = Overlay::with_font_file("/nonexistent/font.ttf").err().unwrap();
        assert!(matches!(err, StageError::InvalidConfig(_)));
    }

    #[test]
    fn non_font_file_is_a_config_error() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        let err = Overlay::with_font_file(path).err().unwrap();
        assert!(matches!(err, StageError::InvalidConfig(_)));
    }

    fn imageops_crop(image: &RgbImage, x: u32, y: u32, w: u32, h: u32) -> RgbImage {
        image::imageops::crop_imm(image, x, y, w, h).to_image()
    }
}
