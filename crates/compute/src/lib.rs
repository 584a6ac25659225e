pub mod dissolve;
pub mod error;
pub mod reproject;
pub mod sampler;

pub use dissolve::*;
pub use error::*;
pub use reproject::*;
pub use sampler::*;
