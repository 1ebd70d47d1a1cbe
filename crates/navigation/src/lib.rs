pub mod autorotate;
pub mod engine;
pub mod path;

pub use autorotate::*;
pub use engine::*;
pub use path::*;
