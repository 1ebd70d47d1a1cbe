pub mod budget;
pub mod frame;
pub mod timer;

pub use budget::*;
pub use frame::*;
pub use timer::*;
