pub mod event;
pub mod frame;

pub use event::{BoundingBox, MotionEvent, SnapshotPair, TriggeredEvent};
pub use frame::{CannedFrameSource, Frame, FrameSource};
