use anyhow::Context;
use chrono::Local;
use motioncore::interface::{Frame, FrameSource};
use motioncore::prelude::{StageError, StageResult};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Replays still images from a directory in file-name order.
pub struct DirectorySource {
    pending: VecDeque<PathBuf>,
    interval: Option<Duration>,
    last_emit: Option<Instant>,
}

impl DirectorySource {
    pub fn open<P: AsRef<Path>>(dir: P, fps: Option<u32>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("listing frames in {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        Ok(Self {
            pending: files.into(),
            interval: fps
                .filter(|fps| *fps > 0)
                .map(|fps| Duration::from_secs_f64(1.0 / fps as f64)),
            last_emit: None,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.interval, self.last_emit) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> StageResult<Option<Frame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|err| StageError::FrameAcquisition(format!("{}: {}", path.display(), err)))?
            .to_rgb8();
        self.pace();
        Ok(Some(Frame::new(image, Local::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn replays_images_in_name_order_and_skips_other_files() {
        let dir = tempdir().unwrap();
        RgbImage::from_pixel(8, 6, Rgb([20, 20, 20]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(8, 6, Rgb([10, 10, 10]))
            .save(dir.path().join("a.png"))
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectorySource::open(dir.path(), None).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.image.get_pixel(0, 0).0[0], 10);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.image.get_pixel(0, 0).0[0], 20);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn unreadable_image_is_an_acquisition_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();
        let mut source = DirectorySource::open(dir.path(), None).unwrap();
        let err = source.next_frame().unwrap_err();
        assert!(matches!(err, StageError::FrameAcquisition(_)));
    }

    #[test]
    fn missing_directory_fails_to_open() {
        assert!(DirectorySource::open("/nonexistent/frames", None).is_err());
    }
}
