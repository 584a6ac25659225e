//! Figure configuration: defaults, then `ATLAS_*` environment variables,
//! then explicit overrides (CLI flags).

use std::path::PathBuf;
use std::str::FromStr;

use foundation::{BoundingBox, Crs, CrsError};
use formats::{CsvOptions, RegionError, RegionSelector, Resolution};
use layers::Palette;
use thiserror::Error;

pub const ENV_TARGET_CRS: &str = "ATLAS_TARGET_CRS";
pub const ENV_VIEWPORT: &str = "ATLAS_VIEWPORT";
pub const ENV_SAMPLE_COUNT: &str = "ATLAS_SAMPLE_COUNT";
pub const ENV_RANDOM_SEED: &str = "ATLAS_RANDOM_SEED";
pub const ENV_REGION: &str = "ATLAS_REGION";
pub const ENV_RESOLUTION: &str = "ATLAS_RESOLUTION";
pub const ENV_REGION_DIR: &str = "ATLAS_REGION_DIR";

pub const DEFAULT_TARGET_CRS: &str = "EPSG:3035";
pub const DEFAULT_VIEWPORT: [f64; 4] = [-10.0, 30.0, 40.0, 60.0];
pub const DEFAULT_REGION: &str = "Europe";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid target CRS: {0}")]
    Crs(#[source] CrsError),

    #[error("invalid viewport: {0}")]
    Viewport(#[source] CrsError),

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Unvalidated settings as text, layered from several sources.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigOverrides {
    pub target_crs: Option<String>,
    pub viewport: Option<String>,
    pub sample_count: Option<usize>,
    pub random_seed: Option<u64>,
    pub region: Option<String>,
    pub resolution: Option<String>,
    pub region_dir: Option<PathBuf>,
    pub localities: Option<PathBuf>,
    pub category_column: Option<String>,
    pub delimiter: Option<char>,
    pub palette: Option<String>,
}

impl ConfigOverrides {
    /// Reads the `ATLAS_*` variables through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            target_crs: env_var_string(&lookup, ENV_TARGET_CRS),
            viewport: env_var_string(&lookup, ENV_VIEWPORT),
            sample_count: env_var_parsed(&lookup, ENV_SAMPLE_COUNT)?,
            random_seed: env_var_parsed(&lookup, ENV_RANDOM_SEED)?,
            region: env_var_string(&lookup, ENV_REGION),
            resolution: env_var_string(&lookup, ENV_RESOLUTION),
            region_dir: region_dir_from_env_with(&lookup),
            ..Self::default()
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Values set in `other` win.
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            target_crs: other.target_crs.or(self.target_crs),
            viewport: other.viewport.or(self.viewport),
            sample_count: other.sample_count.or(self.sample_count),
            random_seed: other.random_seed.or(self.random_seed),
            region: other.region.or(self.region),
            resolution: other.resolution.or(self.resolution),
            region_dir: other.region_dir.or(self.region_dir),
            localities: other.localities.or(self.localities),
            category_column: other.category_column.or(self.category_column),
            delimiter: other.delimiter.or(self.delimiter),
            palette: other.palette.or(self.palette),
        }
    }

    /// Applies defaults to anything unset and validates the result.
    pub fn resolve(self) -> Result<FigureConfig, ConfigError> {
        let target_crs = Crs::parse(self.target_crs.as_deref().unwrap_or(DEFAULT_TARGET_CRS))
            .map_err(ConfigError::Crs)?;

        let [xmin, ymin, xmax, ymax] = match &self.viewport {
            Some(raw) => parse_viewport(raw)?,
            None => DEFAULT_VIEWPORT,
        };
        let viewport = BoundingBox::new(xmin, ymin, xmax, ymax, Crs::wgs84())
            .map_err(ConfigError::Viewport)?;

        let region = RegionSelector::from_str(self.region.as_deref().unwrap_or(DEFAULT_REGION))?;
        let resolution = match &self.resolution {
            Some(raw) => raw.parse::<Resolution>()?,
            None => Resolution::default(),
        };

        let delimiter = match self.delimiter {
            None => b',',
            Some(c) if c.is_ascii() => c as u8,
            Some(c) => {
                return Err(ConfigError::InvalidValue {
                    key: "delimiter",
                    value: c.to_string(),
                    reason: "must be a single ASCII character".to_string(),
                });
            }
        };

        let palette = match &self.palette {
            Some(raw) => raw.parse::<Palette>().map_err(|e| ConfigError::InvalidValue {
                key: "palette",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => Palette::default(),
        };

        Ok(FigureConfig {
            target_crs,
            viewport,
            sample_count: self.sample_count.unwrap_or(0),
            random_seed: self.random_seed,
            region,
            resolution,
            region_dir: self.region_dir,
            localities: self.localities,
            csv: CsvOptions {
                delimiter,
                category_column: self.category_column,
            },
            palette,
        })
    }
}

/// Validated settings for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureConfig {
    pub target_crs: Crs,
    /// Geodetic degrees.
    pub viewport: BoundingBox,
    pub sample_count: usize,
    pub random_seed: Option<u64>,
    pub region: RegionSelector,
    pub resolution: Resolution,
    /// Directory of Natural Earth country layers; required to run.
    pub region_dir: Option<PathBuf>,
    pub localities: Option<PathBuf>,
    pub csv: CsvOptions,
    pub palette: Palette,
}

/// Only `ATLAS_REGION_DIR`, for commands that need no figure settings.
pub fn region_dir_from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    env_var_string(&lookup, ENV_REGION_DIR).map(PathBuf::from)
}

pub fn region_dir_from_env() -> Option<PathBuf> {
    region_dir_from_env_with(|key| std::env::var(key).ok())
}

/// `xmin,ymin,xmax,ymax`, comma or whitespace separated.
pub fn parse_viewport(raw: &str) -> Result<[f64; 4], ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: "viewport",
        value: raw.to_string(),
        reason,
    };
    let parts: Vec<&str> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 4 {
        return Err(invalid(format!("expected 4 numbers, got {}", parts.len())));
    }
    let mut out = [0.0; 4];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| invalid(format!("'{part}' is not a number")))?;
    }
    Ok(out)
}

fn env_var_string(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_var_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = env_var_string(lookup, key) else {
        return Ok(None);
    };
    raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw,
        reason: "not a non-negative integer".to_string(),
    })
}
