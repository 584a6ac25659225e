use geo::Coord;

use crate::crs::Crs;
use crate::error::CrsError;
use crate::math::{Laea, is_valid_lon_lat};

/// Point transform between two CRSs, pivoting through geodetic degrees.
#[derive(Debug, Clone)]
pub struct Transformer {
    source: Crs,
    target: Crs,
    source_proj: Option<Laea>,
    target_proj: Option<Laea>,
}

impl Transformer {
    pub fn new(source: &Crs, target: &Crs) -> Self {
        Self {
            source: source.clone(),
            target: target.clone(),
            source_proj: source.projection(),
            target_proj: target.projection(),
        }
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    pub fn transform(&self, coord: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(domain_error(&self.source, coord, "coordinate is not finite"));
        }

        let [lon, lat] = match &self.source_proj {
            None => {
                if !is_valid_lon_lat(coord.x, coord.y) {
                    return Err(domain_error(
                        &self.source,
                        coord,
                        "longitude must be within [-180, 180] and latitude within [-90, 90]",
                    ));
                }
                [coord.x, coord.y]
            }
            Some(_) if self.is_identity() => return Ok(coord),
            Some(proj) => proj
                .inverse(coord.x, coord.y)
                .map_err(|reason| domain_error(&self.source, coord, reason))?,
        };

        match &self.target_proj {
            None => Ok(Coord { x: lon, y: lat }),
            Some(proj) => {
                let [x, y] = proj
                    .forward(lon, lat)
                    .map_err(|reason| domain_error(&self.target, coord, reason))?;
                Ok(Coord { x, y })
            }
        }
    }
}

fn domain_error(crs: &Crs, coord: Coord<f64>, reason: &str) -> CrsError {
    CrsError::Domain {
        crs: crs.id().to_string(),
        x: coord.x,
        y: coord.y,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::Transformer;
    use crate::crs::Crs;
    use geo::Coord;
    use proptest::prelude::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn projects_tutorial_localities() {
        let t = Transformer::new(&Crs::wgs84(), &Crs::laea_europe());
        let p = t.transform(Coord { x: 9.11, y: 33.08 }).unwrap();
        assert_close(p.x, 4_236_789.46, 0.01);
        assert_close(p.y, 1_117_904.65, 0.01);
        let q = t.transform(Coord { x: 15.13, y: 39.96 }).unwrap();
        assert_close(q.x, 4_761_277.41, 0.01);
        assert_close(q.y, 1_888_911.18, 0.01);
    }

    #[test]
    fn identity_passes_through() {
        let t = Transformer::new(&Crs::laea_europe(), &Crs::laea_europe());
        assert!(t.is_identity());
        let c = Coord { x: 1.0e9, y: -3.0 };
        assert_eq!(t.transform(c).unwrap(), c);
    }

    #[test]
    fn rejects_out_of_range_and_antipodal_input() {
        let t = Transformer::new(&Crs::wgs84(), &Crs::laea_europe());
        assert!(t.transform(Coord { x: 181.0, y: 0.0 }).unwrap_err().is_domain());
        assert!(t.transform(Coord { x: 0.0, y: f64::NAN }).unwrap_err().is_domain());
        let err = t.transform(Coord { x: -170.0, y: -52.0 }).unwrap_err();
        assert!(err.is_domain());
        assert!(err.to_string().contains("EPSG:3035"), "{err}");
    }

    #[test]
    fn rejects_planar_points_outside_the_projection_disc() {
        let t = Transformer::new(&Crs::laea_europe(), &Crs::wgs84());
        let err = t.transform(Coord { x: 4.0e7, y: 0.0 }).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn reprojects_between_two_laea_systems() {
        let other = Crs::parse("+proj=laea +lat_0=40 +lon_0=0").unwrap();
        let forward = Transformer::new(&Crs::laea_europe(), &other);
        let back = Transformer::new(&other, &Crs::laea_europe());
        let start = Coord { x: 4_000_000.0, y: 3_000_000.0 };
        let rt = back.transform(forward.transform(start).unwrap()).unwrap();
        assert_close(rt.x, start.x, 1e-4);
        assert_close(rt.y, start.y, 1e-4);
    }

    proptest! {
        #[test]
        fn wgs84_laea_round_trip(lon in -40.0f64..60.0, lat in 20.0f64..80.0) {
            let to = Transformer::new(&Crs::wgs84(), &Crs::laea_europe());
            let from = Transformer::new(&Crs::laea_europe(), &Crs::wgs84());
            let p = to.transform(Coord { x: lon, y: lat }).unwrap();
            prop_assert!(p.x.is_finite() && p.y.is_finite());
            let rt = from.transform(p).unwrap();
            prop_assert!((rt.x - lon).abs() < 1e-6);
            prop_assert!((rt.y - lat).abs() < 1e-6);
        }
    }
}
