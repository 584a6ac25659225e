//! Ellipsoidal Lambert Azimuthal Equal-Area projection (EPSG method 9820).
//!
//! Oblique aspect follows IOGP Guidance Note 7-2. The polar aspects are
//! handled separately because the oblique scale factor `D` degenerates to
//! `0/0` at the poles.

use serde::{Deserialize, Serialize};

use super::geodesy::{Ellipsoid, normalize_lon_rad};

/// Parameters of a Lambert Azimuthal Equal-Area CRS.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaeaParams {
    pub lat0_deg: f64,
    pub lon0_deg: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
}

impl LaeaParams {
    /// ETRS89-extended / LAEA Europe (EPSG:3035).
    pub const EUROPE: LaeaParams = LaeaParams {
        lat0_deg: 52.0,
        lon0_deg: 10.0,
        false_easting: 4_321_000.0,
        false_northing: 3_210_000.0,
        ellipsoid: Ellipsoid::GRS80,
    };
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Aspect {
    North,
    South,
    Oblique,
}

const POLE_EPS: f64 = 1e-10;
const ANTIPODE_EPS: f64 = 1e-12;

/// Precomputed LAEA constants for one parameter set.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Laea {
    params: LaeaParams,
    aspect: Aspect,
    lat0: f64,
    lon0: f64,
    e: f64,
    e2: f64,
    qp: f64,
    rq: f64,
    sin_b0: f64,
    cos_b0: f64,
    d: f64,
}

impl Laea {
    pub fn new(params: LaeaParams) -> Self {
        let ellps = params.ellipsoid;
        let e2 = ellps.e2();
        let e = ellps.e();
        let lat0 = params.lat0_deg.to_radians();
        let lon0 = params.lon0_deg.to_radians();

        let qp = authalic_q(std::f64::consts::FRAC_PI_2, e, e2);
        let rq = ellps.a * (qp / 2.0).sqrt();

        let aspect = if (lat0 - std::f64::consts::FRAC_PI_2).abs() < POLE_EPS {
            Aspect::North
        } else if (lat0 + std::f64::consts::FRAC_PI_2).abs() < POLE_EPS {
            Aspect::South
        } else {
            Aspect::Oblique
        };

        let b0 = (authalic_q(lat0, e, e2) / qp).clamp(-1.0, 1.0).asin();
        let (sin_b0, cos_b0) = b0.sin_cos();
        let d = if aspect == Aspect::Oblique {
            let sin_lat0 = lat0.sin();
            ellps.a * (lat0.cos() / (1.0 - e2 * sin_lat0 * sin_lat0).sqrt()) / (rq * cos_b0)
        } else {
            1.0
        };

        Self {
            params,
            aspect,
            lat0,
            lon0,
            e,
            e2,
            qp,
            rq,
            sin_b0,
            cos_b0,
            d,
        }
    }

    pub fn params(&self) -> &LaeaParams {
        &self.params
    }

    /// Largest distance from the projection centre that any point maps to.
    pub fn max_radius(&self) -> f64 {
        2.0 * self.rq
    }

    /// Geodetic degrees to projected metres.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Result<[f64; 2], &'static str> {
        let lat = lat_deg.to_radians();
        let dlon = normalize_lon_rad(lon_deg.to_radians() - self.lon0);
        let q = authalic_q(lat, self.e, self.e2);
        let a = self.params.ellipsoid.a;

        let (dx, dy) = match self.aspect {
            Aspect::North => {
                if (lat + std::f64::consts::FRAC_PI_2).abs() < POLE_EPS {
                    return Err("south pole is singular for a north-polar azimuthal projection");
                }
                let rho = a * (self.qp - q).max(0.0).sqrt();
                (rho * dlon.sin(), -rho * dlon.cos())
            }
            Aspect::South => {
                if (lat - std::f64::consts::FRAC_PI_2).abs() < POLE_EPS {
                    return Err("north pole is singular for a south-polar azimuthal projection");
                }
                let rho = a * (self.qp + q).max(0.0).sqrt();
                (rho * dlon.sin(), rho * dlon.cos())
            }
            Aspect::Oblique => {
                let beta = (q / self.qp).clamp(-1.0, 1.0).asin();
                let (sin_b, cos_b) = beta.sin_cos();
                let cos_dlon = dlon.cos();
                let denom = 1.0 + self.sin_b0 * sin_b + self.cos_b0 * cos_b * cos_dlon;
                if denom <= ANTIPODE_EPS {
                    return Err("point is antipodal to the projection centre");
                }
                let b = self.rq * (2.0 / denom).sqrt();
                (
                    b * self.d * cos_b * dlon.sin(),
                    (b / self.d) * (self.cos_b0 * sin_b - self.sin_b0 * cos_b * cos_dlon),
                )
            }
        };

        Ok([
            self.params.false_easting + dx,
            self.params.false_northing + dy,
        ])
    }

    /// Projected metres back to geodetic degrees `[lon, lat]`.
    pub fn inverse(&self, easting: f64, northing: f64) -> Result<[f64; 2], &'static str> {
        let dx = easting - self.params.false_easting;
        let dy = northing - self.params.false_northing;

        let (beta, lon) = match self.aspect {
            Aspect::North | Aspect::South => {
                let rho = (dx * dx + dy * dy).sqrt();
                self.check_radius(rho)?;
                let a = self.params.ellipsoid.a;
                let ratio = (1.0 - rho * rho / (a * a * self.qp)).clamp(-1.0, 1.0);
                if self.aspect == Aspect::North {
                    (ratio.asin(), self.lon0 + dx.atan2(-dy))
                } else {
                    (-ratio.asin(), self.lon0 + dx.atan2(dy))
                }
            }
            Aspect::Oblique => {
                let rho = ((dx / self.d).powi(2) + (self.d * dy).powi(2)).sqrt();
                if rho < POLE_EPS {
                    return Ok([self.params.lon0_deg, self.params.lat0_deg]);
                }
                self.check_radius(rho)?;
                let c = 2.0 * (rho / (2.0 * self.rq)).min(1.0).asin();
                let (sin_c, cos_c) = c.sin_cos();
                let beta = (cos_c * self.sin_b0 + self.d * dy * sin_c * self.cos_b0 / rho)
                    .clamp(-1.0, 1.0)
                    .asin();
                let lon = self.lon0
                    + (dx * sin_c).atan2(
                        self.d * rho * self.cos_b0 * cos_c
                            - self.d * self.d * dy * self.sin_b0 * sin_c,
                    );
                (beta, lon)
            }
        };

        let lat = self.authalic_to_geodetic(beta);
        Ok([
            normalize_lon_rad(lon).to_degrees(),
            lat.to_degrees().clamp(-90.0, 90.0),
        ])
    }

    fn check_radius(&self, rho: f64) -> Result<(), &'static str> {
        if !rho.is_finite() || rho > self.max_radius() * (1.0 + 1e-12) {
            return Err("point lies beyond the projection's maximum radius");
        }
        Ok(())
    }

    fn authalic_to_geodetic(&self, beta: f64) -> f64 {
        let e2 = self.e2;
        if e2 == 0.0 {
            return beta;
        }
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let mut lat = beta
            + (e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
            + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
            + (761.0 * e6 / 45360.0) * (6.0 * beta).sin();

        // Newton refinement on q(lat) = qp * sin(beta); the series alone stops near 1e-9 rad.
        let target = self.qp * beta.sin();
        for _ in 0..2 {
            let cos_lat = lat.cos();
            if cos_lat.abs() < POLE_EPS {
                break;
            }
            let sin_lat = lat.sin();
            let w = 1.0 - e2 * sin_lat * sin_lat;
            let residual = target - authalic_q(lat, self.e, e2);
            lat += w * w / (2.0 * (1.0 - e2) * cos_lat) * residual;
        }
        lat
    }

    /// Projection centre as `[lon, lat]` degrees.
    pub fn origin_deg(&self) -> [f64; 2] {
        [self.lon0.to_degrees(), self.lat0.to_degrees()]
    }
}

/// Snyder's `q` (authalic latitude helper) for geodetic latitude `lat`.
fn authalic_q(lat: f64, e: f64, e2: f64) -> f64 {
    let sin_lat = lat.sin();
    if e == 0.0 {
        return 2.0 * sin_lat;
    }
    let es = e * sin_lat;
    (1.0 - e2) * (sin_lat / (1.0 - e2 * sin_lat * sin_lat) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}
