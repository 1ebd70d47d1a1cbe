pub mod assets;
pub mod descriptor;
pub mod manifest;

pub use assets::*;
pub use descriptor::*;
pub use manifest::*;
