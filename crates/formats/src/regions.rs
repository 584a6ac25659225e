//! Country outlines for a requested region.
//!
//! A [`RegionSource`] hands back every country of one resolution tier;
//! [`provide`] filters them down to a [`RegionSelector`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use foundation::{Crs, Shape};
use geo::MultiPolygon;
use thiserror::Error;
use tracing::{debug, info};

use crate::geojson::{GeoJsonError, RegionFeature, parse_region_features};

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("no region matches '{selector}' in {source_name}")]
    Lookup {
        selector: String,
        source_name: String,
    },

    #[error("{source_name} has no {resolution} country layer")]
    ResolutionUnavailable {
        source_name: String,
        resolution: Resolution,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: GeoJsonError,
    },

    #[error("invalid {what} '{value}'")]
    InvalidArgument { what: &'static str, value: String },
}

/// Natural Earth scale tier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    /// 1:110m
    #[default]
    Small,
    /// 1:50m
    Medium,
    /// 1:10m
    Large,
}

impl Resolution {
    /// Scale token used in Natural Earth file names.
    pub fn scale(self) -> &'static str {
        match self {
            Resolution::Small => "110m",
            Resolution::Medium => "50m",
            Resolution::Large => "10m",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resolution::Small => "small",
            Resolution::Medium => "medium",
            Resolution::Large => "large",
        };
        write!(f, "{name} (1:{})", self.scale())
    }
}

impl FromStr for Resolution {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "110m" | "110" => Ok(Resolution::Small),
            "medium" | "50m" | "50" => Ok(Resolution::Medium),
            "large" | "10m" | "10" => Ok(Resolution::Large),
            _ => Err(RegionError::InvalidArgument {
                what: "resolution",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelector {
    World,
    Continent(String),
    Country(String),
}

impl RegionSelector {
    fn matches(&self, feature: &RegionFeature) -> bool {
        match self {
            RegionSelector::World => true,
            RegionSelector::Continent(name) => feature
                .continent
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(name)),
            RegionSelector::Country(name) => feature.name.eq_ignore_ascii_case(name),
        }
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelector::World => f.write_str("world"),
            RegionSelector::Continent(name) => f.write_str(name),
            RegionSelector::Country(name) => write!(f, "country:{name}"),
        }
    }
}

impl FromStr for RegionSelector {
    type Err = RegionError;

    /// `world`, `country:<name>`, or a continent name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RegionError::InvalidArgument {
                what: "region selector",
                value: s.to_string(),
            });
        }
        if s.eq_ignore_ascii_case("world") {
            return Ok(RegionSelector::World);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("country:") {
            let name = s[s.len() - rest.len()..].trim();
            if name.is_empty() {
                return Err(RegionError::InvalidArgument {
                    what: "region selector",
                    value: s.to_string(),
                });
            }
            return Ok(RegionSelector::Country(name.to_string()));
        }
        Ok(RegionSelector::Continent(s.to_string()))
    }
}

/// Supplier of the full country layer at a given resolution.
pub trait RegionSource {
    fn name(&self) -> String;

    fn load(&self, resolution: Resolution) -> Result<Vec<RegionFeature>, RegionError>;
}

/// Country layer already held in memory, serving one resolution tier.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    resolution: Resolution,
    features: Vec<RegionFeature>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, resolution: Resolution, features: Vec<RegionFeature>) -> Self {
        Self {
            name: name.into(),
            resolution,
            features,
        }
    }

    /// Parses a GeoJSON FeatureCollection of countries.
    pub fn from_geojson(
        name: impl Into<String>,
        resolution: Resolution,
        text: &str,
    ) -> Result<Self, RegionError> {
        let name = name.into();
        let features = parse_region_features(text).map_err(|source| RegionError::Parse {
            origin: name.clone(),
            source,
        })?;
        Ok(Self::new(name, resolution, features))
    }
}

impl RegionSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self, resolution: Resolution) -> Result<Vec<RegionFeature>, RegionError> {
        if resolution != self.resolution {
            return Err(RegionError::ResolutionUnavailable {
                source_name: self.name(),
                resolution,
            });
        }
        Ok(self.features.clone())
    }
}

/// Directory of `ne_<scale>_admin_0_countries.geojson` files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, resolution: Resolution) -> PathBuf {
        self.root
            .join(format!("ne_{}_admin_0_countries.geojson", resolution.scale()))
    }
}

impl RegionSource for DirectorySource {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn load(&self, resolution: Resolution) -> Result<Vec<RegionFeature>, RegionError> {
        let path = self.path_for(resolution);
        if !path.is_file() {
            return Err(RegionError::ResolutionUnavailable {
                source_name: self.name(),
                resolution,
            });
        }
        // The handle is closed once read_to_string returns.
        let payload = std::fs::read_to_string(&path).map_err(|source| RegionError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = payload.len(), "read country layer");
        parse_region_features(&payload).map_err(|source| RegionError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }
}

/// Countries selected from one source, in source order, tagged WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCollection {
    crs: Crs,
    features: Vec<RegionFeature>,
}

impl RegionCollection {
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn features(&self) -> &[RegionFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// All member polygons as one shape, without merging shared edges.
    pub fn to_shape(&self) -> Shape {
        let polygons = self
            .features
            .iter()
            .flat_map(|f| f.geometry.0.iter().cloned())
            .collect();
        Shape::new(MultiPolygon::new(polygons), self.crs.clone())
    }
}

/// Countries of `source` at `resolution` that match `selector`.
///
/// Fails with [`RegionError::Lookup`] rather than returning an empty
/// collection.
pub fn provide(
    source: &dyn RegionSource,
    selector: &RegionSelector,
    resolution: Resolution,
) -> Result<RegionCollection, RegionError> {
    let features: Vec<RegionFeature> = source
        .load(resolution)?
        .into_iter()
        .filter(|f| selector.matches(f))
        .collect();

    if features.is_empty() {
        return Err(RegionError::Lookup {
            selector: selector.to_string(),
            source_name: source.name(),
        });
    }

    info!(
        region = %selector,
        %resolution,
        countries = features.len(),
        "selected reference geometry"
    );
    Ok(RegionCollection {
        crs: Crs::wgs84(),
        features,
    })
}

/// Country names grouped by continent, both sorted. Countries without a
/// continent are listed under `""`.
pub fn catalog(
    source: &dyn RegionSource,
    resolution: Resolution,
) -> Result<BTreeMap<String, Vec<String>>, RegionError> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for feature in source.load(resolution)? {
        out.entry(feature.continent.unwrap_or_default())
            .or_default()
            .push(feature.name);
    }
    for names in out.values_mut() {
        names.sort();
    }
    Ok(out)
}
