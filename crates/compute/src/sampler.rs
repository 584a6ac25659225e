//! Uniform random points over polygon area.
//!
//! Polygons are ear-cut into triangles; each draw picks a triangle weighted
//! by area and then a point inside it. Under a projected CRS a draw consumes
//! exactly three `f64` values from the generator (triangle, then two
//! barycentric terms). Under a geographic CRS the planar density is
//! corrected to true surface area: a fourth value accepts the candidate
//! with probability proportional to `cos(latitude)`, and rejected
//! candidates are redrawn. Either way a seeded sampler is reproducible
//! bit-for-bit.

use earcutr::earcut;
use foundation::Shape;
use formats::{LocalityDataset, LocalityRecord};
use geo::{Coord, LineString, Polygon};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::GeometryError;

#[derive(Debug, Copy, Clone, PartialEq)]
struct Triangle {
    a: Coord<f64>,
    b: Coord<f64>,
    c: Coord<f64>,
}

impl Triangle {
    fn area(&self) -> f64 {
        ((self.b.x - self.a.x) * (self.c.y - self.a.y) - (self.c.x - self.a.x) * (self.b.y - self.a.y))
            .abs()
            * 0.5
    }

    /// Square-root barycentric mapping of `(r1, r2)` in `[0, 1)^2`.
    fn point_at(&self, r1: f64, r2: f64) -> Coord<f64> {
        let s = r1.sqrt();
        let wa = 1.0 - s;
        let wb = s * (1.0 - r2);
        let wc = s * r2;
        let x = wa * self.a.x + wb * self.b.x + wc * self.c.x;
        let y = wa * self.a.y + wb * self.b.y + wc * self.c.y;
        // Keep rounding from stepping outside the triangle's envelope.
        Coord {
            x: x.clamp(
                self.a.x.min(self.b.x).min(self.c.x),
                self.a.x.max(self.b.x).max(self.c.x),
            ),
            y: y.clamp(
                self.a.y.min(self.b.y).min(self.c.y),
                self.a.y.max(self.b.y).max(self.c.y),
            ),
        }
    }
}

pub struct PointSampler {
    rng: ChaCha8Rng,
}

impl PointSampler {
    /// Seeded generator, or OS entropy when `seed` is `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng }
    }

    /// `n` points distributed uniformly over the area of `shape`, holes
    /// excluded. Points on an edge count as inside.
    pub fn sample(&mut self, shape: &Shape, n: usize) -> Result<Vec<Coord<f64>>, GeometryError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let triangles = triangulate(shape)?;
        let mut cumulative = Vec::with_capacity(triangles.len());
        let mut total = 0.0;
        for t in &triangles {
            total += t.area();
            cumulative.push(total);
        }
        if !(total > 0.0 && total.is_finite()) {
            return Err(GeometryError::degenerate("polygon has zero area"));
        }

        // Largest area element cos(lat) over the shape, for acceptance.
        let max_cos_lat = if shape.crs().is_geographic() {
            let c = max_cos_lat(&triangles);
            if !(c > 0.0) {
                return Err(GeometryError::degenerate("polygon has no surface area"));
            }
            Some(c)
        } else {
            None
        };

        let last = triangles.len() - 1;
        let mut out = Vec::with_capacity(n);
        let mut rejected = 0usize;
        while out.len() < n {
            let pick = self.rng.r#gen::<f64>() * total;
            let r1 = self.rng.r#gen::<f64>();
            let r2 = self.rng.r#gen::<f64>();
            let ix = cumulative.partition_point(|&c| c <= pick).min(last);
            let p = triangles[ix].point_at(r1, r2);
            if let Some(max_cos) = max_cos_lat
                && self.rng.r#gen::<f64>() * max_cos >= p.y.to_radians().cos()
            {
                rejected += 1;
                continue;
            }
            out.push(p);
        }

        debug!(
            points = n,
            rejected,
            triangles = triangles.len(),
            area = total,
            "sampled polygon"
        );
        Ok(out)
    }

    /// Samples wrapped as a dataset under the shape's CRS, labeled `"1"..="n"`
    /// and all sharing `category`.
    pub fn sample_localities(
        &mut self,
        shape: &Shape,
        n: usize,
        category: &str,
    ) -> Result<LocalityDataset, GeometryError> {
        let records = self
            .sample(shape, n)?
            .into_iter()
            .enumerate()
            .map(|(i, c)| LocalityRecord::new(c, (i + 1).to_string(), category))
            .collect();
        Ok(LocalityDataset::new(records, shape.crs().clone())?)
    }
}

fn triangulate(shape: &Shape) -> Result<Vec<Triangle>, GeometryError> {
    if shape.is_empty() {
        return Err(GeometryError::degenerate("shape has no polygons"));
    }
    let mut triangles = Vec::new();
    for polygon in shape.polygons().iter() {
        triangulate_polygon(polygon, &mut triangles)?;
    }
    if triangles.is_empty() {
        return Err(GeometryError::degenerate("shape has no rings with area"));
    }
    Ok(triangles)
}

fn triangulate_polygon(polygon: &Polygon<f64>, out: &mut Vec<Triangle>) -> Result<(), GeometryError> {
    let mut vertices: Vec<Coord<f64>> = Vec::new();
    let mut coords_2d: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    for (ring_i, ring) in rings.enumerate() {
        let ring_pts = open_ring(ring);
        if ring_pts.len() < 3 {
            if ring_i == 0 {
                return Ok(());
            }
            continue;
        }
        if ring_i > 0 {
            hole_indices.push(vertices.len());
        }
        for p in ring_pts {
            coords_2d.push(p.x);
            coords_2d.push(p.y);
            vertices.push(p);
        }
    }

    let indices = earcut(&coords_2d, &hole_indices, 2)
        .map_err(|e| GeometryError::degenerate(format!("triangulation failed: {e:?}")))?;
    for tri in indices.chunks_exact(3) {
        let t = Triangle {
            a: vertices[tri[0]],
            b: vertices[tri[1]],
            c: vertices[tri[2]],
        };
        if t.area() > 0.0 {
            out.push(t);
        }
    }
    Ok(())
}

/// `cos` of the latitude nearest the equator among the triangles' extents.
fn max_cos_lat(triangles: &[Triangle]) -> f64 {
    let (lo, hi) = triangles
        .iter()
        .flat_map(|t| [t.a.y, t.b.y, t.c.y])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if lo <= 0.0 && hi >= 0.0 {
        1.0
    } else {
        lo.abs().min(hi.abs()).to_radians().cos()
    }
}

/// Ring vertices without the closing duplicate.
fn open_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut pts: Vec<Coord<f64>> = ring.0.clone();
    if pts.len() >= 2 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}
