pub mod cache;
pub mod hints;
pub mod prefetch;
pub mod queue;

pub use cache::*;
pub use hints::*;
pub use prefetch::*;
pub use queue::*;
