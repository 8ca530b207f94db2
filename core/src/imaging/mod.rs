pub mod blur;
pub mod overlay;
pub mod region;

pub use blur::GaussianBlur;
pub use overlay::Overlay;
pub use region::{extract_regions, Region};
