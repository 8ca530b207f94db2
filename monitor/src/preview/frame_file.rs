use crate::preview::model::PreviewModel;
use crate::preview::PreviewSink;
use image::{ImageFormat, RgbImage};
use log::{info, warn};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Local preview: keeps the latest annotated frame in a JPEG file that an
/// image viewer can watch, and logs each change of detection status.
pub struct FramePreview {
    path: PathBuf,
    staging: PathBuf,
    last_status: Option<String>,
    failing: bool,
}

impl FramePreview {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut staging = path.clone().into_os_string();
        staging.push(".part");
        Self {
            path,
            staging: PathBuf::from(staging),
            last_status: None,
            failing: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encodes to a staging file and renames it over the preview so readers
    /// never see a half-written frame.
    fn write_frame(&self, frame: &RgbImage) -> anyhow::Result<()> {
        let mut encoded = Vec::new();
        frame.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)?;
        fs::write(&self.staging, &encoded)?;
        fs::rename(&self.staging, &self.path)?;
        Ok(())
    }
}

impl PreviewSink for FramePreview {
    fn publish(&mut self, model: PreviewModel, frame: &RgbImage) {
        if self.last_status.as_deref() != Some(model.status.as_str()) {
            info!("[preview] {}", model.status);
            self.last_status = Some(model.status);
        }

        match self.write_frame(frame) {
            Ok(()) => self.failing = false,
            Err(err) => {
                // One warning per failure streak.
                if !self.failing {
                    warn!("[preview] could not write {}: {}", self.path.display(), err);
                }
                self.failing = true;
            }
        }
    }
}
