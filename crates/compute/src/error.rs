use foundation::CrsError;
use formats::LocalityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryError {
    /// Empty input, or geometry without usable area.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error(transparent)]
    Crs(#[from] CrsError),

    #[error(transparent)]
    Locality(#[from] LocalityError),
}

impl GeometryError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        GeometryError::Degenerate(reason.into())
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, GeometryError::Degenerate(_))
    }
}
