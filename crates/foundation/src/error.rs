use thiserror::Error;

/// Failures raised by CRS parsing, coordinate transforms and bounding boxes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrsError {
    /// Unsupported or malformed CRS identifier.
    #[error("unsupported CRS '{definition}': {reason}")]
    Config { definition: String, reason: String },

    /// Coordinate outside the domain of validity of a CRS.
    #[error("coordinate ({x}, {y}) is outside the domain of {crs}: {reason}")]
    Domain {
        crs: String,
        x: f64,
        y: f64,
        reason: String,
    },

    /// Two values tagged with different CRSs were combined.
    #[error("CRS mismatch: {left} vs {right}")]
    Mismatch { left: String, right: String },

    #[error("invalid bounding box: {0}")]
    InvalidBounds(String),
}

impl CrsError {
    pub(crate) fn config(definition: &str, reason: impl Into<String>) -> Self {
        CrsError::Config {
            definition: definition.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, CrsError::Domain { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, CrsError::Config { .. })
    }
}
