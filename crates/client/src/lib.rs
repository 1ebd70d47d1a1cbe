pub mod config;
pub mod guide;
pub mod viewer;

pub use config::*;
pub use guide::*;
pub use viewer::*;
