pub mod protocol;
pub mod reconnect;
pub mod registry;
pub mod reporter;

pub use protocol::*;
pub use reconnect::*;
pub use registry::*;
pub use reporter::*;
