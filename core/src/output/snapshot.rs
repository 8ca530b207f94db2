use crate::interface::{SnapshotPair, TriggeredEvent};
use crate::prelude::{StageError, StageResult};
use chrono::{DateTime, Local};
use image::RgbImage;
use std::path::{Path, PathBuf};

pub const ANNOTATED_DIR: &str = "pi_images";
pub const RAW_DIR: &str = "pi_images_raw";
const FILE_STAMP_FORMAT: &str = "%y-%m-%d-%H-%M-%S";

/// Persists the annotated and raw images of a fired event.
pub trait SnapshotWriter {
    fn write(&mut self, event: &TriggeredEvent) -> StageResult<SnapshotPair>;
}

/// Writes JPEG snapshots under `<base>/pi_images` and `<base>/pi_images_raw`.
///
/// Both directories must already exist.
pub struct DiskSnapshotWriter {
    base: PathBuf,
}

impl DiskSnapshotWriter {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base: base.into() }
    }

    pub fn annotated_dir(&self) -> PathBuf {
        self.base.join(ANNOTATED_DIR)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.base.join(RAW_DIR)
    }

    pub fn file_name(timestamp: &DateTime<Local>) -> String {
        format!("{}.jpg", timestamp.format(FILE_STAMP_FORMAT))
    }

    /// Directories that are expected but missing.
    pub fn missing_dirs(&self) -> Vec<PathBuf> {
        [self.annotated_dir(), self.raw_dir()]
            .into_iter()
            .filter(|dir| !dir.is_dir())
            .collect()
    }

    fn save(image: &RgbImage, path: &Path) -> StageResult<()> {
        image.save(path).map_err(|err| StageError::Persistence {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

impl SnapshotWriter for DiskSnapshotWriter {
    fn write(&mut self, event: &TriggeredEvent) -> StageResult<SnapshotPair> {
        let name = Self::file_name(&event.captured_at);
        let annotated_path = self.annotated_dir().join(&name);
        let raw_path = self.raw_dir().join(&name);

        Self::save(&event.annotated, &annotated_path)?;
        Self::save(&event.raw, &raw_path)?;

        Ok(SnapshotPair {
            annotated_path,
            raw_path,
            timestamp: event.captured_at,
        })
    }
}
