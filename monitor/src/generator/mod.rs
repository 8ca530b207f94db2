pub mod replay;
pub mod scene;

pub use replay::DirectorySource;
pub use scene::{SceneConfig, SyntheticCamera};
