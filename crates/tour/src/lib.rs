pub mod narration;
pub mod plan;
pub mod scheduler;

pub use narration::*;
pub use plan::*;
pub use scheduler::*;
