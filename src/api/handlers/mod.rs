pub mod predict;
pub mod system;

pub use predict::*;
pub use system::*;
