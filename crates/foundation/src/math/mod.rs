pub mod geodesy;
pub mod laea;

pub use geodesy::*;
pub use laea::*;
