pub mod angles;
pub mod curves;
pub mod vec;

pub use angles::*;
pub use curves::*;
pub use vec::*;
