use geo::{Coord, Rect};
use serde::Serialize;

use crate::crs::Crs;
use crate::error::CrsError;
use crate::math::is_valid_lon_lat;
use crate::transform::Transformer;

const GOLDEN_ITERATIONS: usize = 64;
const REFINED_SLACK: f64 = 1e-12;

/// Directions searched per edge: -x, +x, -y, +y.
const EXTENT_KEYS: [fn(Coord<f64>) -> f64; 4] = [
    |c: Coord<f64>| -c.x,
    |c: Coord<f64>| c.x,
    |c: Coord<f64>| -c.y,
    |c: Coord<f64>| c.y,
];

/// How a bounding box is carried into another CRS.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoundsSampling {
    /// Reproject the four corners only. Under a non-linear projection the
    /// result can be smaller than the true envelope and clip content.
    Corners,
    /// Reproject `per_edge` evenly spaced samples along each edge, then
    /// refine each edge's extreme samples by golden-section search so an
    /// extremum falling between samples is still enclosed.
    Densified { per_edge: usize },
}

impl Default for BoundsSampling {
    fn default() -> Self {
        BoundsSampling::Densified { per_edge: 64 }
    }
}

/// Axis-aligned bounding box tagged with the CRS it was computed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    min: [f64; 2],
    max: [f64; 2],
    crs: Crs,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, crs: Crs) -> Result<Self, CrsError> {
        if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
            return Err(CrsError::InvalidBounds(
                "extents must be finite numbers".to_string(),
            ));
        }
        if xmin > xmax || ymin > ymax {
            return Err(CrsError::InvalidBounds(format!(
                "expected xmin <= xmax and ymin <= ymax, got ({xmin}, {ymin}, {xmax}, {ymax})"
            )));
        }
        if crs.is_geographic() && !(is_valid_lon_lat(xmin, ymin) && is_valid_lon_lat(xmax, ymax)) {
            return Err(CrsError::InvalidBounds(format!(
                "({xmin}, {ymin}, {xmax}, {ymax}) exceeds geodetic ranges"
            )));
        }
        Ok(Self {
            min: [xmin, ymin],
            max: [xmax, ymax],
            crs,
        })
    }

    /// Envelope of `coords`, or `None` when there are no finite coordinates.
    pub fn from_coords(coords: impl IntoIterator<Item = Coord<f64>>, crs: Crs) -> Option<Self> {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        let mut any = false;
        for c in coords {
            if !c.x.is_finite() || !c.y.is_finite() {
                continue;
            }
            any = true;
            min[0] = min[0].min(c.x);
            min[1] = min[1].min(c.y);
            max[0] = max[0].max(c.x);
            max[1] = max[1].max(c.y);
        }
        any.then_some(Self { min, max, crs })
    }

    pub fn xmin(&self) -> f64 {
        self.min[0]
    }

    pub fn ymin(&self) -> f64 {
        self.min[1]
    }

    pub fn xmax(&self) -> f64 {
        self.max[0]
    }

    pub fn ymax(&self) -> f64 {
        self.max[1]
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min[0] + self.max[0]) * 0.5,
            y: (self.min[1] + self.max[1]) * 0.5,
        }
    }

    /// Closed containment: points on the edges are inside.
    pub fn contains(&self, c: Coord<f64>) -> bool {
        c.x >= self.min[0] && c.x <= self.max[0] && c.y >= self.min[1] && c.y <= self.max[1]
    }

    /// Whether `other` lies entirely within this box. Both must share a CRS.
    pub fn contains_box(&self, other: &BoundingBox) -> Result<bool, CrsError> {
        self.crs.ensure_same(&other.crs)?;
        Ok(self.contains(Coord {
            x: other.min[0],
            y: other.min[1],
        }) && self.contains(Coord {
            x: other.max[0],
            y: other.max[1],
        }))
    }

    /// Smallest box covering both. Both must share a CRS.
    pub fn union(&self, other: &BoundingBox) -> Result<BoundingBox, CrsError> {
        self.crs.ensure_same(&other.crs)?;
        Ok(Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
            crs: self.crs.clone(),
        })
    }

    /// Grows every side by `fraction` of the box's width/height.
    pub fn padded(&self, fraction: f64) -> BoundingBox {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Self {
            min: [self.min[0] - dx, self.min[1] - dy],
            max: [self.max[0] + dx, self.max[1] + dy],
            crs: self.crs.clone(),
        }
    }

    /// Corners in counter-clockwise order starting at `(xmin, ymin)`.
    pub fn corners(&self) -> [Coord<f64>; 4] {
        [
            Coord { x: self.min[0], y: self.min[1] },
            Coord { x: self.max[0], y: self.min[1] },
            Coord { x: self.max[0], y: self.max[1] },
            Coord { x: self.min[0], y: self.max[1] },
        ]
    }

    /// `per_edge` evenly spaced points along each edge, corners included.
    pub fn edge_samples(&self, per_edge: usize) -> Vec<Coord<f64>> {
        let steps = per_edge.max(1);
        let corners = self.corners();
        let mut out = Vec::with_capacity(steps * 4);
        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            for s in 0..steps {
                let t = s as f64 / steps as f64;
                out.push(Coord {
                    x: a.x + (b.x - a.x) * t,
                    y: a.y + (b.y - a.y) * t,
                });
            }
        }
        out
    }

    /// Carries the box into `target`.
    ///
    /// Every sampled boundary point must be inside the target's domain;
    /// otherwise the transform error is returned unchanged.
    pub fn reproject(&self, target: &Crs, sampling: BoundsSampling) -> Result<BoundingBox, CrsError> {
        let transformer = Transformer::new(&self.crs, target);
        if transformer.is_identity() {
            return Ok(Self {
                crs: target.clone(),
                ..self.clone()
            });
        }

        let projected = match sampling {
            BoundsSampling::Corners => self
                .corners()
                .into_iter()
                .map(|c| transformer.transform(c))
                .collect::<Result<Vec<_>, _>>()?,
            BoundsSampling::Densified { per_edge } => self.refined_edges(&transformer, per_edge)?,
        };

        let envelope = BoundingBox::from_coords(projected, target.clone()).ok_or_else(|| {
            CrsError::InvalidBounds("no finite coordinates after reprojection".to_string())
        })?;
        Ok(match sampling {
            BoundsSampling::Corners => envelope,
            BoundsSampling::Densified { .. } => envelope.widened(REFINED_SLACK),
        })
    }

    /// Projected edge samples plus, per edge and per axis direction, the
    /// refined extreme between the neighbours of the most extreme sample.
    fn refined_edges(&self, transformer: &Transformer, per_edge: usize) -> Result<Vec<Coord<f64>>, CrsError> {
        let steps = per_edge.max(1);
        let corners = self.corners();
        let mut out = Vec::with_capacity((steps + 1 + EXTENT_KEYS.len()) * 4);

        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            let project_at = |t: f64| {
                transformer.transform(Coord {
                    x: a.x + (b.x - a.x) * t,
                    y: a.y + (b.y - a.y) * t,
                })
            };

            let projected = (0..=steps)
                .map(|s| project_at(s as f64 / steps as f64))
                .collect::<Result<Vec<_>, _>>()?;

            for key in EXTENT_KEYS {
                let Some(k) = (0..projected.len())
                    .max_by(|&l, &r| key(projected[l]).total_cmp(&key(projected[r])))
                else {
                    continue;
                };
                let lo = k.saturating_sub(1) as f64 / steps as f64;
                let hi = (k + 1).min(steps) as f64 / steps as f64;
                let t = golden_max(lo, hi, |t| project_at(t).map(key))?;
                out.push(project_at(t)?);
            }
            out.extend(projected);
        }
        Ok(out)
    }

    /// Grows every side by `relative` times the largest coordinate magnitude
    /// (at least 1 unit), absorbing rounding in the refinement.
    fn widened(&self, relative: f64) -> BoundingBox {
        let scale = self
            .min
            .iter()
            .chain(&self.max)
            .fold(1.0_f64, |m, v| m.max(v.abs()));
        let pad = scale * relative;
        Self {
            min: [self.min[0] - pad, self.min[1] - pad],
            max: [self.max[0] + pad, self.max[1] + pad],
            crs: self.crs.clone(),
        }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: self.min[0], y: self.min[1] },
            Coord { x: self.max[0], y: self.max[1] },
        )
    }
}

/// Golden-section search for the maximum of a unimodal `f` on `[lo, hi]`.
fn golden_max(
    mut lo: f64,
    mut hi: f64,
    f: impl Fn(f64) -> Result<f64, CrsError>,
) -> Result<f64, CrsError> {
    const INV_PHI: f64 = 0.618_033_988_749_894_9;
    let ends = [lo, hi];
    let mut c = hi - (hi - lo) * INV_PHI;
    let mut d = lo + (hi - lo) * INV_PHI;
    let mut fc = f(c)?;
    let mut fd = f(d)?;
    for _ in 0..GOLDEN_ITERATIONS {
        if fc >= fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - (hi - lo) * INV_PHI;
            fc = f(c)?;
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + (hi - lo) * INV_PHI;
            fd = f(d)?;
        }
    }
    // A monotone stretch peaks at one of the original ends.
    let mut best = (if fc >= fd { c } else { d }, fc.max(fd));
    for t in ends {
        let v = f(t)?;
        if v > best.1 {
            best = (t, v);
        }
    }
    Ok(best.0)
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, BoundsSampling};
    use crate::crs::Crs;
    use crate::transform::Transformer;
    use geo::Coord;
    use proptest::prelude::*;

    fn viewport() -> BoundingBox {
        BoundingBox::new(-10.0, 30.0, 40.0, 60.0, Crs::wgs84()).unwrap()
    }

    #[test]
    fn rejects_inverted_and_out_of_range_boxes() {
        assert!(BoundingBox::new(1.0, 0.0, 0.0, 1.0, Crs::wgs84()).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, f64::NAN, Crs::wgs84()).is_err());
        assert!(BoundingBox::new(-200.0, 0.0, 0.0, 1.0, Crs::wgs84()).is_err());
        assert!(BoundingBox::new(-2.0e6, 0.0, 0.0, 1.0, Crs::laea_europe()).is_ok());
    }

    #[test]
    fn union_requires_matching_crs() {
        let a = viewport();
        let b = BoundingBox::new(0.0, 0.0, 1.0, 1.0, Crs::laea_europe()).unwrap();
        assert!(a.union(&b).is_err());
        assert!(a.contains_box(&b).is_err());

        let c = BoundingBox::new(50.0, -5.0, 60.0, 0.0, Crs::wgs84()).unwrap();
        let u = a.union(&c).unwrap();
        assert_eq!([u.xmin(), u.ymin(), u.xmax(), u.ymax()], [-10.0, -5.0, 60.0, 60.0]);
    }

    #[test]
    fn edge_samples_walk_the_boundary() {
        let samples = viewport().edge_samples(4);
        assert_eq!(samples.len(), 16);
        assert_eq!(samples[0], Coord { x: -10.0, y: 30.0 });
        assert_eq!(samples[2], Coord { x: 15.0, y: 30.0 });
        assert!(samples.iter().all(|c| viewport().contains(*c)));
    }

    #[test]
    fn corner_reprojection_clips_the_curved_southern_edge() {
        let target = Crs::laea_europe();
        let corners = viewport().reproject(&target, BoundsSampling::Corners).unwrap();
        let dense = viewport().reproject(&target, BoundsSampling::default()).unwrap();

        assert_eq!(dense.crs(), &target);
        assert!(dense.contains_box(&corners).unwrap());
        // The lat=30 edge bows south of its corners by roughly 250 km.
        assert!(corners.ymin() - dense.ymin() > 200_000.0);

        let t = Transformer::new(&Crs::wgs84(), &target);
        let mid = t.transform(Coord { x: 15.0, y: 30.0 }).unwrap();
        assert!(dense.contains(mid));
        assert!(!corners.contains(mid));
    }

    #[test]
    fn densified_box_encloses_extremum_between_samples() {
        let target = Crs::laea_europe();
        let dense = viewport().reproject(&target, BoundsSampling::default()).unwrap();
        // The lat=30 edge is lowest where it crosses the 10E central meridian,
        // which falls between two of the 64 edge samples.
        let lowest = Transformer::new(&Crs::wgs84(), &target)
            .transform(Coord { x: 10.0, y: 30.0 })
            .unwrap();
        assert!(dense.contains(lowest), "{lowest:?} outside {dense:?}");
        assert!(dense.ymin() - lowest.y > -1e-3);
    }

    #[test]
    fn reprojection_to_same_crs_is_identity() {
        let b = viewport();
        assert_eq!(b.reproject(&Crs::wgs84(), BoundsSampling::Corners).unwrap(), b);
    }

    #[test]
    fn padding_grows_all_sides() {
        let p = viewport().padded(0.5);
        assert_eq!([p.xmin(), p.ymin(), p.xmax(), p.ymax()], [-35.0, 15.0, 65.0, 75.0]);
    }

    proptest! {
        #[test]
        fn densified_box_contains_every_boundary_point(
            xmin in -30.0f64..20.0,
            width in 1.0f64..40.0,
            ymin in 25.0f64..55.0,
            height in 1.0f64..20.0,
            per_edge in 1usize..16,
            edge in 0usize..4,
            t in 0.0f64..=1.0,
        ) {
            let b = BoundingBox::new(xmin, ymin, xmin + width, ymin + height, Crs::wgs84()).unwrap();
            let target = Crs::laea_europe();
            let dense = b.reproject(&target, BoundsSampling::Densified { per_edge }).unwrap();

            let corners = b.corners();
            let (a, c) = (corners[edge], corners[(edge + 1) % 4]);
            let on_edge = Coord { x: a.x + (c.x - a.x) * t, y: a.y + (c.y - a.y) * t };
            let q = Transformer::new(&Crs::wgs84(), &target).transform(on_edge).unwrap();
            prop_assert!(dense.contains(q), "{:?} outside {:?}", q, dense);
        }
    }
}
