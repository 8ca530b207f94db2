//! Frame-processing and motion-decision core for the camera motion monitor.
//!
//! Each frame flows through preprocessing, the running background model,
//! the motion classifier and the event debouncer; fired events are handed to
//! the output side, which persists snapshots and sends notifications.

pub mod imaging;
pub mod interface;
pub mod output;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{PipelineConfig, ProcessingStage, StageError, StageResult};
pub use processing::{CycleOutcome, MotionPipeline, PipelineState};
