pub mod annotations;
pub mod labels;
pub mod layer;
pub mod map;
pub mod palette;
pub mod render;
pub mod symbology;

pub use annotations::*;
pub use labels::*;
pub use layer::*;
pub use map::*;
pub use palette::Palette;
pub use render::*;
pub use symbology::*;
