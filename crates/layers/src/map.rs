//! Immutable figure description assembled through [`MapFigureBuilder`].

use std::collections::HashSet;

use foundation::{BoundingBox, Crs, Shape};
use formats::LocalityDataset;

use crate::annotations::Annotation;
use crate::labels::LabelStyle;
use crate::layer::{Layer, LayerId, MapLayer, PointLayer, PolygonLayer};
use crate::render::RenderError;
use crate::symbology::{CategoryMapping, PolygonStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct MapFigure {
    crs: Crs,
    viewport: BoundingBox,
    title: Option<String>,
    layers: Vec<MapLayer>,
    annotations: Vec<Annotation>,
}

impl MapFigure {
    pub fn builder(crs: Crs, viewport: BoundingBox) -> MapFigureBuilder {
        MapFigureBuilder {
            crs,
            viewport,
            title: None,
            layers: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn viewport(&self) -> &BoundingBox {
        &self.viewport
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

#[derive(Debug, Clone)]
pub struct MapFigureBuilder {
    crs: Crs,
    viewport: BoundingBox,
    title: Option<String>,
    layers: Vec<MapLayer>,
    annotations: Vec<Annotation>,
}

impl MapFigureBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn polygon_layer(mut self, name: impl Into<String>, shape: Shape, style: PolygonStyle) -> Self {
        let id = self.next_id();
        self.layers.push(MapLayer::Polygon(PolygonLayer {
            id,
            name: name.into(),
            shape,
            style,
        }));
        self
    }

    pub fn point_layer(
        mut self,
        name: impl Into<String>,
        dataset: LocalityDataset,
        mapping: CategoryMapping,
        labels: Option<LabelStyle>,
    ) -> Self {
        let id = self.next_id();
        self.layers.push(MapLayer::Point(PointLayer {
            id,
            name: name.into(),
            dataset,
            mapping,
            labels,
        }));
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Checks that the viewport and every layer use the figure CRS, that
    /// layer names are unique, and that every point category has a style.
    pub fn build(self) -> Result<MapFigure, RenderError> {
        self.crs.ensure_same(self.viewport.crs())?;

        let mut names = HashSet::new();
        for layer in &self.layers {
            self.crs.ensure_same(layer.crs())?;
            if !names.insert(layer.name()) {
                return Err(RenderError::Figure(format!(
                    "duplicate layer name '{}'",
                    layer.name()
                )));
            }
            if let MapLayer::Point(points) = layer
                && let Some(missing) = points
                    .dataset
                    .categories()
                    .into_iter()
                    .find(|c| points.mapping.style_for(c).is_none())
            {
                return Err(RenderError::Style(format!(
                    "layer '{}' has no style for category '{missing}'",
                    points.name
                )));
            }
        }

        Ok(MapFigure {
            crs: self.crs,
            viewport: self.viewport,
            title: self.title,
            layers: self.layers,
            annotations: self.annotations,
        })
    }

    fn next_id(&self) -> LayerId {
        LayerId(self.layers.len() as u64)
    }
}
