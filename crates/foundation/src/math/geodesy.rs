use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// GRS80 semi-major axis (meters). Identical to WGS84.
pub const GRS80_A: f64 = 6_378_137.0;
/// GRS80 flattening.
pub const GRS80_F: f64 = 1.0 / 298.257_222_101;

/// Reference ellipsoid described by its semi-major axis and flattening.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub a: f64,
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid::new(WGS84_A, WGS84_F);
    pub const GRS80: Ellipsoid = Ellipsoid::new(GRS80_A, GRS80_F);

    pub const fn new(a: f64, f: f64) -> Self {
        Self { a, f }
    }

    /// Looks up an ellipsoid by its PROJ `+ellps=` name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "WGS84" => Some(Self::WGS84),
            "GRS80" => Some(Self::GRS80),
            _ => None,
        }
    }

    /// Semi-minor axis (meters).
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// First eccentricity.
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }
}

/// Geodetic coordinates in radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geodetic {
    pub lat_rad: f64,
    pub lon_rad: f64,
}

impl Geodetic {
    pub fn new(lat_rad: f64, lon_rad: f64) -> Self {
        Self { lat_rad, lon_rad }
    }

    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians())
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon_rad.to_degrees()
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat_rad.to_degrees()
    }
}

/// True when `lon`/`lat` are finite degrees inside the geodetic ranges.
pub fn is_valid_lon_lat(lon_deg: f64, lat_deg: f64) -> bool {
    lon_deg.is_finite()
        && lat_deg.is_finite()
        && (-180.0..=180.0).contains(&lon_deg)
        && (-90.0..=90.0).contains(&lat_deg)
}

/// Wraps a longitude in radians into `[-pi, pi]`.
pub fn normalize_lon_rad(lon: f64) -> f64 {
    use std::f64::consts::PI;
    if (-PI..=PI).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI && lon > 0.0 { PI } else { wrapped }
}
