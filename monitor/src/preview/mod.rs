pub mod bridge;
pub mod frame_file;
pub mod model;

pub use bridge::PreviewBridge;
pub use frame_file::FramePreview;
pub use model::PreviewModel;

use image::RgbImage;

/// Receives every processed frame together with its status.
pub trait PreviewSink {
    fn publish(&mut self, model: PreviewModel, frame: &RgbImage);
}
