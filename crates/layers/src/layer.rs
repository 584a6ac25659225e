use foundation::{Crs, Shape};
use formats::LocalityDataset;
use serde::Serialize;

use crate::labels::LabelStyle;
use crate::symbology::{CategoryMapping, PolygonStyle};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId(pub u64);

pub trait Layer {
    fn id(&self) -> LayerId;

    fn name(&self) -> &str;

    /// CRS the layer's coordinates are expressed in.
    fn crs(&self) -> &Crs;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonLayer {
    pub(crate) id: LayerId,
    pub name: String,
    pub shape: Shape,
    pub style: PolygonStyle,
}

impl Layer for PolygonLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn crs(&self) -> &Crs {
        self.shape.crs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLayer {
    pub(crate) id: LayerId,
    pub name: String,
    pub dataset: LocalityDataset,
    pub mapping: CategoryMapping,
    /// `None` draws markers only.
    pub labels: Option<LabelStyle>,
}

impl Layer for PointLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn crs(&self) -> &Crs {
        self.dataset.crs()
    }
}

/// Layers in drawing order, bottom first.
#[derive(Debug, Clone, PartialEq)]
pub enum MapLayer {
    Polygon(PolygonLayer),
    Point(PointLayer),
}

impl MapLayer {
    fn inner(&self) -> &dyn Layer {
        match self {
            MapLayer::Polygon(l) => l,
            MapLayer::Point(l) => l,
        }
    }
}

impl Layer for MapLayer {
    fn id(&self) -> LayerId {
        self.inner().id()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn crs(&self) -> &Crs {
        self.inner().crs()
    }
}
