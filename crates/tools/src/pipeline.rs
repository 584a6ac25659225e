//! End-to-end run: localities and reference geometry in, figure out.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use compute::{PointSampler, dissolve, reproject_dataset, reproject_shape};
use formats::{
    DirectorySource, LocalityDataset, RegionCollection, RegionSource, Resolution, catalog, provide,
};
use foundation::{BoundingBox, BoundsSampling, Crs, Shape, Transformer};
use geo::Coord;
use layers::{
    Annotation, CategoryMapping, FillStyle, LabelStyle, MapFigure, PolygonStyle, StrokeStyle,
};
use tracing::info;

use crate::config::{ENV_REGION_DIR, FigureConfig};

/// Category given to sampled points.
pub const SAMPLE_CATEGORY: &str = "random";

/// Everything a run produced, projected into the target CRS.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub regions: RegionCollection,
    /// Unioned landmass.
    pub land: Shape,
    /// Per-country outlines, borders kept.
    pub countries: Shape,
    pub localities: Option<LocalityDataset>,
    /// Drawn over `land` in the target CRS.
    pub samples: Option<LocalityDataset>,
    pub viewport: BoundingBox,
    pub figure: MapFigure,
}

/// Natural Earth country layers under `region_dir`.
pub fn region_source(region_dir: Option<&Path>) -> Result<DirectorySource> {
    let dir = region_dir.with_context(|| {
        format!(
            "no country layer configured: pass --region-dir or set {ENV_REGION_DIR} to a \
             directory holding ne_<110m|50m|10m>_admin_0_countries.geojson"
        )
    })?;
    Ok(DirectorySource::new(dir))
}

/// Country names per continent from the layer under `region_dir`.
pub fn region_catalog(
    region_dir: Option<&Path>,
    resolution: Resolution,
) -> Result<BTreeMap<String, Vec<String>>> {
    let source = region_source(region_dir)?;
    catalog(&source, resolution).with_context(|| format!("listing {}", source.name()))
}

pub fn run(config: &FigureConfig) -> Result<PipelineOutput> {
    let localities = match &config.localities {
        Some(path) => {
            let ds = LocalityDataset::from_csv_path(path, &config.csv)
                .with_context(|| format!("loading localities from {}", path.display()))?;
            info!(records = ds.len(), categories = ds.categories().len(), "loaded localities");
            Some(ds)
        }
        None => None,
    };
    run_with(config, localities)
}

/// Runs the pipeline on an already loaded WGS84 dataset.
pub fn run_with(config: &FigureConfig, localities: Option<LocalityDataset>) -> Result<PipelineOutput> {
    let source = region_source(config.region_dir.as_deref())?;
    run_with_source(config, &source, localities)
}

/// Like [`run_with`], with reference geometry from `source`.
pub fn run_with_source(
    config: &FigureConfig,
    source: &dyn RegionSource,
    localities: Option<LocalityDataset>,
) -> Result<PipelineOutput> {
    let regions = provide(source, &config.region, config.resolution)
        .context("fetching reference geometry")?;
    let land_wgs84 = dissolve(&regions).context("dissolving region outlines")?;

    let target = &config.target_crs;
    let land = reproject_shape(&land_wgs84, target).context("reprojecting landmass")?;
    let countries =
        reproject_shape(&regions.to_shape(), target).context("reprojecting country outlines")?;

    // Sampling the projected land keeps every point on the drawn polygon.
    let samples = if config.sample_count > 0 {
        let mut sampler = PointSampler::new(config.random_seed);
        let ds = sampler
            .sample_localities(&land, config.sample_count, SAMPLE_CATEGORY)
            .context("sampling random localities")?;
        info!(points = ds.len(), seed = ?config.random_seed, crs = %target, "sampled random localities");
        Some(ds)
    } else {
        None
    };

    let localities = localities
        .map(|ds| reproject_dataset(&ds, target))
        .transpose()
        .context("reprojecting localities")?;
    let viewport = config
        .viewport
        .reproject(target, BoundsSampling::default())
        .context("reprojecting viewport")?;
    info!(
        crs = %target,
        xmin = viewport.xmin(),
        ymin = viewport.ymin(),
        xmax = viewport.xmax(),
        ymax = viewport.ymax(),
        "projected viewport"
    );

    let figure = build_figure(
        config,
        &land,
        &countries,
        localities.as_ref(),
        samples.as_ref(),
        &viewport,
    )?;

    Ok(PipelineOutput {
        regions,
        land,
        countries,
        localities,
        samples,
        viewport,
        figure,
    })
}

fn build_figure(
    config: &FigureConfig,
    land: &Shape,
    countries: &Shape,
    localities: Option<&LocalityDataset>,
    samples: Option<&LocalityDataset>,
    viewport: &BoundingBox,
) -> Result<MapFigure> {
    let borders = PolygonStyle {
        fill: FillStyle::none(),
        stroke: StrokeStyle::default(),
    };
    let mut builder = MapFigure::builder(config.target_crs.clone(), viewport.clone())
        .polygon_layer("land", land.clone(), PolygonStyle::default())
        .polygon_layer("countries", countries.clone(), borders);

    if let Some(samples) = samples {
        let mapping = CategoryMapping::uniform(
            samples.categories(),
            [0.45, 0.45, 0.45, 0.8],
            "circle",
        )
        .with_size(3.0);
        builder = builder.point_layer("samples", samples.clone(), mapping, None);
    }
    if let Some(localities) = localities {
        let mapping = CategoryMapping::for_dataset(localities, config.palette);
        builder = builder.point_layer(
            "localities",
            localities.clone(),
            mapping,
            Some(LabelStyle::default()),
        );
    }

    if !config.target_crs.is_geographic() {
        builder = builder.annotation(Annotation::scale_bar());
    }
    builder = builder.annotation(Annotation::north_arrow());

    builder.build().context("assembling figure")
}

/// Projects one geodetic coordinate into `crs`.
pub fn project_point(crs: &Crs, lon: f64, lat: f64) -> Result<Coord<f64>> {
    Transformer::new(&Crs::wgs84(), crs)
        .transform(Coord { x: lon, y: lat })
        .with_context(|| format!("projecting ({lon}, {lat}) to {crs}"))
}
