use crate::interface::BoundingBox;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

/// Outer border of a connected foreground region in a binary mask.
#[derive(Debug, Clone)]
pub struct Region {
    points: Vec<Point<i32>>,
}

impl Region {
    pub fn from_points(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Polygon area enclosed by the border (shoelace formula).
    ///
    /// The border runs through pixel centres, so a filled `w x h` block
    /// measures `(w - 1) * (h - 1)` and a lone pixel measures zero.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice_area: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice_area.abs() as f64 / 2.0
    }

    /// Whether the region is large enough to count as motion.
    pub fn meets_min_area(&self, min_area: f64) -> bool {
        self.area() >= min_area
    }

    /// Inclusive pixel bounds of the border.
    pub fn bounding_box(&self) -> BoundingBox {
        let Some(first) = self.points.first() else {
            return BoundingBox::new(0, 0, 0, 0);
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        BoundingBox::new(
            min_x.max(0) as u32,
            min_y.max(0) as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        )
    }
}

/// Finds the external borders of every non-zero region in `mask`.
///
/// Borders of holes and of regions nested inside holes are skipped. The mask
/// is traced inside a one-pixel empty margin so regions touching the frame
/// edge still get an outer border; points are shifted back afterwards.
pub fn extract_regions(mask: &GrayImage) -> Vec<Region> {
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|contour| {
            matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
        })
        .map(|contour| {
            Region::from_points(
                contour
                    .points
                    .into_iter()
                    .map(|p| Point::new(p.x - 1, p.y - 1))
                    .collect(),
            )
        })
        .collect()
}
