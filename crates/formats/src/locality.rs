//! Point-locality records and their loaders.
//!
//! A [`LocalityDataset`] is built once, from in-memory tuples or from
//! delimited text, and never mutated afterwards. Reprojection produces a new
//! dataset through [`LocalityDataset::try_map_positions`].

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use foundation::{BoundingBox, Crs};
use foundation::math::is_valid_lon_lat;
use geo::Coord;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LocalityError {
    /// A record failed numeric parsing or range validation.
    #[error("invalid locality at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("missing '{0}' column in header")]
    MissingColumn(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
}

impl LocalityError {
    /// True for the data-validation failures (bad rows, missing columns).
    pub fn is_data_validation(&self) -> bool {
        matches!(
            self,
            LocalityError::InvalidRecord { .. } | LocalityError::MissingColumn(_)
        )
    }
}

/// One labeled point. `x`/`y` are longitude/latitude under a geographic
/// CRS and easting/northing otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalityRecord {
    x: f64,
    y: f64,
    label: String,
    category: String,
}

impl LocalityRecord {
    pub fn new(position: Coord<f64>, label: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            x: position.x,
            y: position.y,
            label: label.into(),
            category: category.into(),
        }
    }

    pub fn position(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// Options for [`LocalityDataset::from_csv_reader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Name of the grouping column. `None` picks the first column that is
    /// not `lon`, `lat` or `label`.
    pub category_column: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            category_column: None,
        }
    }
}

const LON_HEADERS: &[&str] = &["lon", "long", "longitude"];
const LAT_HEADERS: &[&str] = &["lat", "latitude"];
const LABEL_HEADERS: &[&str] = &["label"];

/// Ordered, CRS-tagged sequence of localities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalityDataset {
    crs: Crs,
    records: Vec<LocalityRecord>,
}

impl LocalityDataset {
    /// Validates `records` against `crs`: every coordinate must be finite,
    /// and within geodetic ranges when `crs` is geographic.
    pub fn new(records: Vec<LocalityRecord>, crs: Crs) -> Result<Self, LocalityError> {
        for (i, record) in records.iter().enumerate() {
            check_position(record.x, record.y, &crs).map_err(|reason| {
                LocalityError::InvalidRecord { row: i + 1, reason }
            })?;
        }
        warn_on_duplicate_labels(&records);
        Ok(Self { crs, records })
    }

    /// Builds a WGS84 dataset from `(longitude, latitude, label, category)`.
    pub fn from_records<I, L, C>(rows: I) -> Result<Self, LocalityError>
    where
        I: IntoIterator<Item = (f64, f64, L, C)>,
        L: Into<String>,
        C: Into<String>,
    {
        let records = rows
            .into_iter()
            .map(|(lon, lat, label, category)| {
                LocalityRecord::new(Coord { x: lon, y: lat }, label, category)
            })
            .collect();
        Self::new(records, Crs::wgs84())
    }

    /// Reads delimited text with a header row naming `lon`, `lat`, `label`
    /// and a category column. Rows are numbered from 1, header excluded.
    pub fn from_csv_reader<R: Read>(reader: R, options: &CsvOptions) -> Result<Self, LocalityError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .trim(csv::Trim::All)
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let find = |names: &[&str]| column_index(&headers, names);
        let lon_ix = find(LON_HEADERS).ok_or_else(|| LocalityError::MissingColumn("lon".into()))?;
        let lat_ix = find(LAT_HEADERS).ok_or_else(|| LocalityError::MissingColumn("lat".into()))?;
        let label_ix =
            find(LABEL_HEADERS).ok_or_else(|| LocalityError::MissingColumn("label".into()))?;
        let category_ix = match &options.category_column {
            Some(name) => column_index(&headers, &[name.as_str()])
                .ok_or_else(|| LocalityError::MissingColumn(name.clone()))?,
            None => (0..headers.len())
                .find(|ix| ![lon_ix, lat_ix, label_ix].contains(ix))
                .ok_or_else(|| LocalityError::MissingColumn("category".into()))?,
        };
        debug!(
            category = &headers[category_ix],
            "resolved locality columns"
        );

        let mut records = Vec::new();
        for (i, row) in rdr.records().enumerate() {
            let row_no = i + 1;
            let row = row.map_err(|e| row_error(e, row_no))?;
            let field = |ix: usize| row.get(ix).unwrap_or_default();
            let lon = parse_coordinate(field(lon_ix), "lon", row_no)?;
            let lat = parse_coordinate(field(lat_ix), "lat", row_no)?;
            if !is_valid_lon_lat(lon, lat) {
                return Err(LocalityError::InvalidRecord {
                    row: row_no,
                    reason: format!("({lon}, {lat}) is outside geodetic ranges"),
                });
            }
            records.push(LocalityRecord::new(
                Coord { x: lon, y: lat },
                field(label_ix),
                field(category_ix),
            ));
        }

        Self::new(records, Crs::wgs84())
    }

    pub fn from_csv_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self, LocalityError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LocalityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv_reader(file, options)
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn records(&self) -> &[LocalityRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalityRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for r in &self.records {
            if !seen.contains(&r.category.as_str()) {
                seen.push(r.category.as_str());
            }
        }
        seen
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_coords(self.records.iter().map(|r| r.position()), self.crs.clone())
    }

    /// New dataset tagged `target` whose positions are `f` applied to ours.
    /// Labels, categories and order are kept.
    pub fn try_map_positions<E>(
        &self,
        target: Crs,
        mut f: impl FnMut(Coord<f64>) -> Result<Coord<f64>, E>,
    ) -> Result<Self, E> {
        let mut records = Vec::with_capacity(self.records.len());
        for r in &self.records {
            records.push(LocalityRecord::new(
                f(r.position())?,
                r.label.clone(),
                r.category.clone(),
            ));
        }
        Ok(Self {
            crs: target,
            records,
        })
    }
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

/// Ragged rows become [`LocalityError::InvalidRecord`].
fn row_error(err: csv::Error, row: usize) -> LocalityError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => LocalityError::InvalidRecord {
            row,
            reason: format!("expected {expected_len} fields, found {len}"),
        },
        _ => LocalityError::Csv(err),
    }
}

fn parse_coordinate(raw: &str, column: &str, row: usize) -> Result<f64, LocalityError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
        return Err(LocalityError::InvalidRecord {
            row,
            reason: format!("missing {column}"),
        });
    }
    let value: f64 = raw.parse().map_err(|_| LocalityError::InvalidRecord {
        row,
        reason: format!("{column} '{raw}' is not a number"),
    })?;
    if !value.is_finite() {
        return Err(LocalityError::InvalidRecord {
            row,
            reason: format!("{column} '{raw}' is not finite"),
        });
    }
    Ok(value)
}

fn check_position(x: f64, y: f64, crs: &Crs) -> Result<(), String> {
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("coordinates ({x}, {y}) must be finite"));
    }
    if crs.is_geographic() && !is_valid_lon_lat(x, y) {
        return Err(format!("({x}, {y}) is outside geodetic ranges"));
    }
    Ok(())
}

fn warn_on_duplicate_labels(records: &[LocalityRecord]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *counts.entry(r.label.as_str()).or_default() += 1;
    }
    let mut duplicates: Vec<&str> = counts
        .into_iter()
        .filter_map(|(label, n)| (n > 1).then_some(label))
        .collect();
    if duplicates.is_empty() {
        return;
    }
    duplicates.sort_unstable();
    warn!(?duplicates, "locality labels are not unique");
}
