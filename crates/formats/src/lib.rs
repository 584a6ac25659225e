pub mod geojson;
pub mod locality;
pub mod regions;

pub use geojson::*;
pub use locality::*;
pub use regions::*;
