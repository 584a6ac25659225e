pub mod bounds;
pub mod crs;
pub mod error;
pub mod math;
pub mod shape;
pub mod transform;

// Foundation crate: CRS model, projection math and CRS-tagged primitives.
pub use bounds::*;
pub use crs::*;
pub use error::*;
pub use shape::*;
pub use transform::*;
