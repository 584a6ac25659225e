//! Coordinate reference systems.
//!
//! A [`Crs`] pairs the identifier it was parsed from with the projection it
//! implies. Equality compares the projection only, so `EPSG:3035` and the
//! equivalent `+proj=laea` string are the same CRS.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::CrsError;
use crate::math::{Ellipsoid, Laea, LaeaParams};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CrsKind {
    /// Longitude/latitude in degrees on WGS84.
    Geographic,
    LambertAzimuthalEqualArea(LaeaParams),
}

#[derive(Debug, Clone)]
pub struct Crs {
    id: String,
    kind: CrsKind,
}

impl Crs {
    pub const WGS84_ID: &'static str = "EPSG:4326";
    pub const LAEA_EUROPE_ID: &'static str = "EPSG:3035";

    pub fn wgs84() -> Self {
        Self {
            id: Self::WGS84_ID.to_string(),
            kind: CrsKind::Geographic,
        }
    }

    pub fn laea_europe() -> Self {
        Self {
            id: Self::LAEA_EUROPE_ID.to_string(),
            kind: CrsKind::LambertAzimuthalEqualArea(LaeaParams::EUROPE),
        }
    }

    pub fn laea(params: LaeaParams) -> Self {
        let ellps = if params.ellipsoid == Ellipsoid::GRS80 {
            "GRS80"
        } else {
            "WGS84"
        };
        Self {
            id: format!(
                "+proj=laea +lat_0={} +lon_0={} +x_0={} +y_0={} +ellps={ellps} +units=m",
                params.lat0_deg, params.lon0_deg, params.false_easting, params.false_northing
            ),
            kind: CrsKind::LambertAzimuthalEqualArea(params),
        }
    }

    /// Parses an EPSG code (`EPSG:4326`, `EPSG:3035`), a well-known alias
    /// (`WGS84`, `CRS84`) or a PROJ-style string (`+proj=laea ...`).
    pub fn parse(definition: &str) -> Result<Self, CrsError> {
        let def = definition.trim();
        if def.is_empty() {
            return Err(CrsError::config(definition, "empty CRS definition"));
        }

        let upper = def.to_ascii_uppercase();
        if let Some(code) = upper.strip_prefix("EPSG:") {
            let code: u32 = code
                .trim()
                .parse()
                .map_err(|_| CrsError::config(definition, "EPSG code must be an integer"))?;
            return match code {
                4326 => Ok(Self::wgs84()),
                3035 => Ok(Self::laea_europe()),
                other => Err(CrsError::config(
                    definition,
                    format!("EPSG:{other} is not a supported CRS"),
                )),
            };
        }

        match upper.as_str() {
            "WGS84" | "WGS 84" | "CRS84" | "OGC:CRS84" => return Ok(Self::wgs84()),
            "LAEA" | "LAEA-EUROPE" | "ETRS89-LAEA" => return Ok(Self::laea_europe()),
            _ => {}
        }

        if def.starts_with('+') {
            return parse_proj_string(def);
        }

        Err(CrsError::config(
            definition,
            "expected an EPSG code or a +proj= string",
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &CrsKind {
        &self.kind
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic)
    }

    /// Planar projection backing this CRS, if any.
    pub fn projection(&self) -> Option<Laea> {
        match self.kind {
            CrsKind::Geographic => None,
            CrsKind::LambertAzimuthalEqualArea(params) => Some(Laea::new(params)),
        }
    }

    /// Fails with [`CrsError::Mismatch`] unless both CRSs are the same.
    pub fn ensure_same(&self, other: &Crs) -> Result<(), CrsError> {
        if self == other {
            Ok(())
        } else {
            Err(CrsError::Mismatch {
                left: self.id.clone(),
                right: other.id.clone(),
            })
        }
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

impl std::str::FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Crs::parse(s)
    }
}

fn parse_proj_string(def: &str) -> Result<Crs, CrsError> {
    let mut proj: Option<String> = None;
    let mut lat0 = 0.0;
    let mut lon0 = 0.0;
    let mut x0 = 0.0;
    let mut y0 = 0.0;
    let mut ellipsoid = Ellipsoid::WGS84;

    for token in def.split_whitespace() {
        let Some(token) = token.strip_prefix('+') else {
            return Err(CrsError::config(def, format!("token '{token}' must start with '+'")));
        };
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };
        let number = |v: Option<&str>| -> Result<f64, CrsError> {
            v.and_then(|s| s.parse::<f64>().ok())
                .filter(|n| n.is_finite())
                .ok_or_else(|| CrsError::config(def, format!("+{key} needs a numeric value")))
        };
        match key {
            "proj" => proj = value.map(|v| v.to_ascii_lowercase()),
            "lat_0" => lat0 = number(value)?,
            "lon_0" => lon0 = number(value)?,
            "x_0" => x0 = number(value)?,
            "y_0" => y0 = number(value)?,
            "ellps" => {
                let name = value.unwrap_or_default();
                ellipsoid = Ellipsoid::by_name(name)
                    .ok_or_else(|| CrsError::config(def, format!("unknown ellipsoid '{name}'")))?;
            }
            "datum" => {
                ellipsoid = match value.map(|v| v.to_ascii_uppercase()).as_deref() {
                    Some("WGS84") => Ellipsoid::WGS84,
                    Some("ETRS89") => Ellipsoid::GRS80,
                    other => {
                        return Err(CrsError::config(
                            def,
                            format!("unknown datum '{}'", other.unwrap_or_default()),
                        ));
                    }
                };
            }
            "units" => {
                if value != Some("m") {
                    return Err(CrsError::config(def, "only metre units are supported"));
                }
            }
            "no_defs" | "type" | "towgs84" | "wktext" => {}
            other => {
                return Err(CrsError::config(def, format!("unsupported parameter +{other}")));
            }
        }
    }

    match proj.as_deref() {
        Some("longlat" | "latlong" | "lonlat") => Ok(Crs {
            id: def.to_string(),
            kind: CrsKind::Geographic,
        }),
        Some("laea") => {
            if !(-90.0..=90.0).contains(&lat0) || !(-180.0..=180.0).contains(&lon0) {
                return Err(CrsError::config(def, "projection centre out of range"));
            }
            Ok(Crs {
                id: def.to_string(),
                kind: CrsKind::LambertAzimuthalEqualArea(LaeaParams {
                    lat0_deg: lat0,
                    lon0_deg: lon0,
                    false_easting: x0,
                    false_northing: y0,
                    ellipsoid,
                }),
            })
        }
        Some(other) => Err(CrsError::config(
            def,
            format!("projection '{other}' is not supported"),
        )),
        None => Err(CrsError::config(def, "missing +proj")),
    }
}

#[cfg(test)]
mod tests {
    use super::{Crs, CrsKind};
    use crate::math::{Ellipsoid, LaeaParams};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_epsg_codes() {
        assert!(Crs::parse("EPSG:4326").unwrap().is_geographic());
        assert!(Crs::parse("epsg:4326").unwrap().is_geographic());
        let laea = Crs::parse(" EPSG:3035 ").unwrap();
        assert_eq!(
            laea.kind(),
            &CrsKind::LambertAzimuthalEqualArea(LaeaParams::EUROPE)
        );
        assert_eq!(laea.id(), "EPSG:3035");
    }

    #[test]
    fn proj_string_equals_epsg_3035() {
        let proj = Crs::parse(
            "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +units=m +no_defs",
        )
        .unwrap();
        assert_eq!(proj, Crs::laea_europe());
        assert_eq!(proj.to_string(), proj.id());
    }

    #[test]
    fn custom_laea_defaults_to_wgs84() {
        let crs = Crs::parse("+proj=laea +lat_0=45 +lon_0=-100").unwrap();
        assert_eq!(
            crs.kind(),
            &CrsKind::LambertAzimuthalEqualArea(LaeaParams {
                lat0_deg: 45.0,
                lon0_deg: -100.0,
                false_easting: 0.0,
                false_northing: 0.0,
                ellipsoid: Ellipsoid::WGS84,
            })
        );
    }

    #[test]
    fn laea_constructor_round_trips_through_parse() {
        let params = LaeaParams {
            lat0_deg: 10.5,
            lon0_deg: 20.0,
            false_easting: 1000.0,
            false_northing: -5.0,
            ellipsoid: Ellipsoid::GRS80,
        };
        let crs = Crs::laea(params);
        assert_eq!(Crs::parse(crs.id()).unwrap(), crs);
    }

    #[test]
    fn rejects_unsupported_and_malformed() {
        for def in [
            "",
            "EPSG:32633",
            "EPSG:abc",
            "+proj=merc",
            "+proj=laea +lat_0=north",
            "+proj=laea +ellps=bessel",
            "+proj=laea +units=km",
            "+lat_0=52",
            "mercator",
        ] {
            let err = Crs::parse(def).expect_err(def);
            assert!(err.is_config(), "{def}: {err}");
        }
    }

    #[test]
    fn mismatch_is_reported() {
        let err = Crs::wgs84().ensure_same(&Crs::laea_europe()).unwrap_err();
        assert_eq!(err.to_string(), "CRS mismatch: EPSG:4326 vs EPSG:3035");
    }
}
