//! Scale bar and north arrow, resolved against the figure viewport.

use foundation::{BoundingBox, Crs, Transformer};
use geo::Coord;
use serde::Serialize;

use crate::render::RenderError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ScaleBarOptions {
    pub corner: Corner,
    /// Upper bound on bar length as a fraction of viewport width.
    pub max_fraction: f64,
}

impl Default for ScaleBarOptions {
    fn default() -> Self {
        Self {
            corner: Corner::BottomLeft,
            max_fraction: 0.25,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct NorthArrowOptions {
    pub corner: Corner,
}

impl Default for NorthArrowOptions {
    fn default() -> Self {
        Self {
            corner: Corner::TopRight,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Annotation {
    ScaleBar(ScaleBarOptions),
    NorthArrow(NorthArrowOptions),
}

impl Annotation {
    pub fn scale_bar() -> Self {
        Annotation::ScaleBar(ScaleBarOptions::default())
    }

    pub fn north_arrow() -> Self {
        Annotation::NorthArrow(NorthArrowOptions::default())
    }

    pub fn resolve(&self, viewport: &BoundingBox) -> Result<ResolvedAnnotation, RenderError> {
        match self {
            Annotation::ScaleBar(opts) => scale_bar(viewport, opts).map(ResolvedAnnotation::ScaleBar),
            Annotation::NorthArrow(opts) => {
                north_arrow(viewport, opts).map(ResolvedAnnotation::NorthArrow)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleBar {
    pub corner: Corner,
    pub length_m: f64,
    pub label: String,
    /// Bar length over viewport width.
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NorthArrow {
    pub corner: Corner,
    /// Clockwise angle from grid up to true north, in degrees.
    pub bearing_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedAnnotation {
    ScaleBar(ScaleBar),
    NorthArrow(NorthArrow),
}

/// Largest `1`, `2` or `5 x 10^k` not exceeding `max`.
pub fn nice_length(max: f64) -> Option<f64> {
    if !(max > 0.0 && max.is_finite()) {
        return None;
    }
    let mut base = 10f64.powi(max.log10().floor() as i32);
    while base > max {
        base /= 10.0;
    }
    while base * 10.0 <= max {
        base *= 10.0;
    }
    [5.0, 2.0, 1.0]
        .into_iter()
        .map(|m| m * base)
        .find(|len| *len <= max)
}

pub fn scale_bar(viewport: &BoundingBox, opts: &ScaleBarOptions) -> Result<ScaleBar, RenderError> {
    let fail = |reason: String| RenderError::Annotation {
        what: "scale bar",
        reason,
    };
    if viewport.crs().is_geographic() {
        return Err(fail(format!(
            "{} is geographic; lengths in metres need a projected CRS",
            viewport.crs()
        )));
    }
    if !(opts.max_fraction > 0.0 && opts.max_fraction <= 1.0) {
        return Err(fail(format!(
            "max_fraction must be in (0, 1], got {}",
            opts.max_fraction
        )));
    }
    let width = viewport.width();
    let length_m = nice_length(width * opts.max_fraction)
        .ok_or_else(|| fail(format!("viewport width {width} has no usable length")))?;
    let label = if length_m >= 1000.0 {
        format!("{} km", length_m / 1000.0)
    } else {
        format!("{length_m} m")
    };
    Ok(ScaleBar {
        corner: opts.corner,
        length_m,
        label,
        fraction: length_m / width,
    })
}

/// Bearing of true north at the viewport centre, from a short northward
/// step projected into the viewport CRS.
pub fn north_arrow(viewport: &BoundingBox, opts: &NorthArrowOptions) -> Result<NorthArrow, RenderError> {
    const STEP_DEG: f64 = 0.01;

    let crs = viewport.crs();
    if crs.is_geographic() {
        return Ok(NorthArrow {
            corner: opts.corner,
            bearing_deg: 0.0,
        });
    }
    let wgs84 = Crs::wgs84();
    let to_geo = Transformer::new(crs, &wgs84);
    let to_map = Transformer::new(&wgs84, crs);

    let c = to_geo.transform(viewport.center())?;
    let (lat0, lat1) = if c.y + STEP_DEG <= 90.0 {
        (c.y, c.y + STEP_DEG)
    } else {
        (c.y - STEP_DEG, c.y)
    };
    let a = to_map.transform(Coord { x: c.x, y: lat0 })?;
    let b = to_map.transform(Coord { x: c.x, y: lat1 })?;
    let bearing_deg = (b.x - a.x).atan2(b.y - a.y).to_degrees();
    Ok(NorthArrow {
        corner: opts.corner,
        bearing_deg,
    })
}
