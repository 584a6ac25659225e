use foundation::{Crs, Shape};
use formats::RegionCollection;
use geo::{Area, BooleanOps, MultiPolygon};
use tracing::info;

use crate::error::GeometryError;

/// Merges every country of `regions` into one landmass without internal
/// seams.
pub fn dissolve(regions: &RegionCollection) -> Result<Shape, GeometryError> {
    if regions.is_empty() {
        return Err(GeometryError::degenerate("no regions to union"));
    }
    let shape = dissolve_polygons(
        regions.features().iter().map(|f| &f.geometry),
        regions.crs().clone(),
    )?;
    info!(
        countries = regions.len(),
        parts = shape.polygons().0.len(),
        area = shape.area(),
        "dissolved reference geometry"
    );
    Ok(shape)
}

/// Boolean union of `parts`, which must all be expressed in `crs`.
pub fn dissolve_polygons<'a>(
    parts: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
    crs: Crs,
) -> Result<Shape, GeometryError> {
    let mut acc: Option<MultiPolygon<f64>> = None;
    for part in parts {
        acc = Some(match acc {
            None => part.clone(),
            Some(merged) => merged.union(part),
        });
    }
    let merged = acc.ok_or_else(|| GeometryError::degenerate("no polygons to union"))?;
    if !(merged.unsigned_area() > 0.0) {
        return Err(GeometryError::degenerate("union has zero area"));
    }
    Ok(Shape::new(merged, crs))
}
