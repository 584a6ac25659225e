use foundation::{BoundingBox, CrsError};
use formats::{localities_to_geojson, shape_to_geojson};
use geo::Coord;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::annotations::ResolvedAnnotation;
use crate::labels::{LabelAnchor, LabelLayoutConfig, LabelProjector, PlacedLabel2D, anchors_for_dataset, layout_labels_2d};
use crate::layer::{Layer, MapLayer};
use crate::map::MapFigure;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Crs(#[from] CrsError),

    #[error("invalid figure: {0}")]
    Figure(String),

    #[error("invalid style: {0}")]
    Style(String),

    #[error("cannot place {what}: {reason}")]
    Annotation { what: &'static str, reason: String },

    #[error("failed to encode figure: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Output of a [`RenderAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub media_type: &'static str,
    pub body: Vec<u8>,
}

/// Turns a finished figure into an output document.
pub trait RenderAdapter {
    fn render(&self, figure: &MapFigure) -> Result<Rendered, RenderError>;
}

/// Maps viewport coordinates onto a `size_px` raster, y down.
#[derive(Debug, Clone)]
pub struct ViewportProjector {
    viewport: BoundingBox,
    size_px: [f32; 2],
}

impl ViewportProjector {
    pub fn new(viewport: BoundingBox, size_px: [f32; 2]) -> Self {
        Self { viewport, size_px }
    }
}

impl LabelProjector for ViewportProjector {
    fn project(&self, position: Coord<f64>) -> Option<[f32; 2]> {
        let w = self.viewport.width();
        let h = self.viewport.height();
        if !(w > 0.0 && h > 0.0) || !self.viewport.contains(position) {
            return None;
        }
        let x = (position.x - self.viewport.xmin()) / w * self.size_px[0] as f64;
        let y = (self.viewport.ymax() - position.y) / h * self.size_px[1] as f64;
        Some([x as f32, y as f32])
    }
}

/// Serializes a figure to JSON for an external plotting front-end, with
/// labels laid out and annotations resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRenderer {
    pub size_px: [f32; 2],
    pub pretty: bool,
    pub layout: LabelLayoutConfig,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self {
            size_px: [1200.0, 900.0],
            pretty: true,
            layout: LabelLayoutConfig::default(),
        }
    }
}

#[derive(Serialize)]
struct FigureDocument<'a> {
    crs: &'a str,
    viewport: [f64; 4],
    size_px: [f32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    layers: Vec<Value>,
    labels: Vec<PlacedLabel2D>,
    annotations: Vec<ResolvedAnnotation>,
}

impl JsonRenderer {
    pub fn document(&self, figure: &MapFigure) -> Result<Value, RenderError> {
        let viewport = figure.viewport();
        let layers = figure.layers().iter().map(layer_value).collect();

        let anchors: Vec<LabelAnchor> = figure
            .layers()
            .iter()
            .filter_map(|l| match l {
                MapLayer::Point(p) => p.labels.as_ref().map(|s| anchors_for_dataset(&p.dataset, s)),
                MapLayer::Polygon(_) => None,
            })
            .flatten()
            .collect();
        let projector = ViewportProjector::new(viewport.clone(), self.size_px);
        let config = LabelLayoutConfig {
            viewport_px: self.size_px,
            ..self.layout
        };
        let labels = layout_labels_2d(&anchors, &projector, config);
        debug!(
            candidates = anchors.len(),
            placed = labels.len(),
            "laid out labels"
        );

        let annotations = figure
            .annotations()
            .iter()
            .map(|a| a.resolve(viewport))
            .collect::<Result<Vec<_>, _>>()?;

        let doc = FigureDocument {
            crs: figure.crs().id(),
            viewport: [viewport.xmin(), viewport.ymin(), viewport.xmax(), viewport.ymax()],
            size_px: self.size_px,
            title: figure.title(),
            layers,
            labels,
            annotations,
        };
        Ok(serde_json::to_value(doc)?)
    }
}

impl RenderAdapter for JsonRenderer {
    fn render(&self, figure: &MapFigure) -> Result<Rendered, RenderError> {
        let doc = self.document(figure)?;
        let body = if self.pretty {
            serde_json::to_vec_pretty(&doc)?
        } else {
            serde_json::to_vec(&doc)?
        };
        Ok(Rendered {
            media_type: "application/json",
            body,
        })
    }
}

fn layer_value(layer: &MapLayer) -> Value {
    match layer {
        MapLayer::Polygon(p) => json!({
            "id": p.id(),
            "name": p.name(),
            "kind": "polygon",
            "style": p.style,
            "data": shape_to_geojson(&p.shape, Map::new()),
        }),
        MapLayer::Point(p) => json!({
            "id": p.id(),
            "name": p.name(),
            "kind": "point",
            "categories": p.mapping.entries(),
            "labeled": p.labels.is_some(),
            "data": localities_to_geojson(&p.dataset),
        }),
    }
}
