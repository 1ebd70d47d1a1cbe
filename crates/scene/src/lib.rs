pub mod adapter;
pub mod capabilities;
pub mod graph;
pub mod placement;

pub use adapter::*;
pub use capabilities::*;
pub use graph::*;
pub use placement::*;
