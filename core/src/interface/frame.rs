use crate::prelude::StageResult;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::collections::VecDeque;

/// Raw color frame as delivered by a camera or a replay source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: DateTime<Local>) -> Self {
        Self { image, captured_at }
    }
}

/// Anything that can hand the pipeline its next frame.
///
/// `Ok(None)` marks a source that ended cleanly (a finished replay); live
/// cameras only ever return frames or a `FrameAcquisition` error.
pub trait FrameSource {
    fn next_frame(&mut self) -> StageResult<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> StageResult<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Deterministic source that replays a fixed list of frames.
pub struct CannedFrameSource {
    frames: VecDeque<Frame>,
}

impl CannedFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for CannedFrameSource {
    fn next_frame(&mut self) -> StageResult<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}
