pub mod background;
pub mod classifier;
pub mod debounce;
pub mod pipeline;
pub mod preprocess;

pub use background::BackgroundModel;
pub use classifier::{Comparison, MotionClassifier};
pub use debounce::{DebounceDecision, DebounceState, EventDebouncer};
pub use pipeline::{CycleOutcome, CycleReport, MotionPipeline, PipelineState};
pub use preprocess::{PreparedFrame, Preprocessor};
