use std::io::Write;
use std::path::Path;

use foundation::Crs;
use formats::{LocalityDataset, RegionSelector, Resolution};
use geo::{CoordsIter, Intersects, Point};
use layers::{JsonRenderer, Layer, MapLayer, RenderAdapter};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tools::{
    ConfigOverrides, FigureConfig, SAMPLE_CATEGORY, project_point, region_catalog, run, run_with,
};

const COARSE_COUNTRIES: &str = include_str!("../../formats/tests/fixtures/coarse_countries.geojson");

fn assert_close(a: f64, b: f64, eps: f64) {
    let diff = (a - b).abs();
    assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
}

/// Directory laid out like a Natural Earth download, holding the coarse
/// test outlines as its 110m layer.
fn region_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ne_110m_admin_0_countries.geojson"), COARSE_COUNTRIES).unwrap();
    dir
}

fn overrides(dir: &Path) -> ConfigOverrides {
    ConfigOverrides {
        region_dir: Some(dir.to_path_buf()),
        ..ConfigOverrides::default()
    }
}

fn config(samples: usize, seed: u64, dir: &Path) -> FigureConfig {
    ConfigOverrides {
        sample_count: Some(samples),
        random_seed: Some(seed),
        ..overrides(dir)
    }
    .resolve()
    .unwrap()
}

fn tutorial_points() -> LocalityDataset {
    LocalityDataset::from_records([(9.11, 33.08, "1", "A"), (15.13, 39.96, "2", "A")]).unwrap()
}

#[test]
fn europe_with_tutorial_points_and_samples() {
    let dir = region_dir();
    let out = run_with(&config(100, 42, dir.path()), Some(tutorial_points())).unwrap();

    assert_eq!(out.regions.len(), 7);
    assert_eq!(out.land.crs(), &Crs::laea_europe());
    assert_eq!(out.countries.crs(), &Crs::laea_europe());
    assert!(out.land.area() > 0.0);
    assert_close(out.countries.area(), out.land.area(), 1e-3 * out.land.area());

    let localities = out.localities.as_ref().unwrap();
    assert_eq!(localities.crs(), &Crs::laea_europe());
    assert_close(localities.records()[0].x(), 4_236_789.46, 0.01);

    let samples = out.samples.as_ref().unwrap();
    assert_eq!(samples.len(), 100);
    assert_eq!(samples.crs(), &Crs::laea_europe());
    assert_eq!(samples.categories(), vec![SAMPLE_CATEGORY]);

    let names: Vec<&str> = out.figure.layers().iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["land", "countries", "samples", "localities"]);
    assert_eq!(out.figure.annotations().len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn samples_lie_on_the_drawn_landmass(seed in any::<u64>()) {
        let dir = region_dir();
        let out = run_with(&config(300, seed, dir.path()), None).unwrap();
        let samples = out.samples.unwrap();
        prop_assert_eq!(samples.len(), 300);
        prop_assert_eq!(samples.crs(), out.land.crs());
        for r in samples.iter() {
            prop_assert!(
                out.land.polygons().intersects(&Point::from(r.position())),
                "{:?} off land",
                r.position()
            );
        }
    }
}

#[test]
fn seeded_runs_repeat() {
    let dir = region_dir();
    let a = run_with(&config(50, 7, dir.path()), None).unwrap();
    let b = run_with(&config(50, 7, dir.path()), None).unwrap();
    assert_eq!(a.samples, b.samples);

    let c = run_with(&config(50, 8, dir.path()), None).unwrap();
    assert!(a.samples != c.samples);
}

#[test]
fn no_samples_means_no_sample_layer() {
    let dir = region_dir();
    let out = run_with(&config(0, 1, dir.path()), None).unwrap();
    assert!(out.samples.is_none());
    assert!(out.figure.layers().iter().all(|l| !matches!(l, MapLayer::Point(_))));
}

#[test]
fn unknown_region_is_reported() {
    let dir = region_dir();
    let mut cfg = config(10, 1, dir.path());
    cfg.region = RegionSelector::Country("Atlantis".into());
    let err = run_with(&cfg, None).unwrap_err();
    assert!(format!("{err:#}").contains("Atlantis"), "{err:#}");
}

#[test]
fn missing_region_dir_is_reported() {
    let cfg = ConfigOverrides::default().resolve().unwrap();
    let err = run_with(&cfg, Some(tutorial_points())).unwrap_err();
    assert!(format!("{err:#}").contains("ATLAS_REGION_DIR"), "{err:#}");

    let err = region_catalog(None, Resolution::Small).unwrap_err();
    assert!(format!("{err:#}").contains("--region-dir"), "{err:#}");
}

#[test]
fn viewport_covers_projected_land() {
    let dir = region_dir();
    let out = run_with(&config(0, 1, dir.path()), None).unwrap();
    assert_eq!(out.viewport.crs(), &Crs::laea_europe());
    for c in out.land.polygons().coords_iter() {
        assert!(out.viewport.contains(c), "{c:?} outside {:?}", out.viewport);
    }
}

#[test]
fn geographic_target_samples_in_degrees() {
    let dir = region_dir();
    let cfg = ConfigOverrides {
        target_crs: Some("EPSG:4326".into()),
        region: Some("country:Italy".into()),
        sample_count: Some(200),
        random_seed: Some(5),
        ..overrides(dir.path())
    }
    .resolve()
    .unwrap();
    let out = run_with(&cfg, None).unwrap();
    assert!(out.land.crs().is_geographic());
    assert_eq!(out.figure.annotations().len(), 1);

    let samples = out.samples.as_ref().unwrap();
    assert!(samples.crs().is_geographic());
    for r in samples.iter() {
        assert!(out.land.polygons().intersects(&Point::from(r.position())));
    }
    JsonRenderer::default().render(&out.figure).unwrap();
}

#[test]
fn run_loads_csv_and_renders() {
    let dir = region_dir();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "lon,lat,label,kind").unwrap();
    writeln!(file, "9.11,33.08,1,A").unwrap();
    writeln!(file, "15.13,39.96,2,B").unwrap();
    file.flush().unwrap();

    let cfg = ConfigOverrides {
        localities: Some(file.path().to_path_buf()),
        sample_count: Some(20),
        random_seed: Some(42),
        ..overrides(dir.path())
    }
    .resolve()
    .unwrap();
    let out = run(&cfg).unwrap();
    assert_eq!(out.localities.as_ref().unwrap().categories(), vec!["A", "B"]);

    let rendered = JsonRenderer::default().render(&out.figure).unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&rendered.body).unwrap();
    assert_eq!(doc["crs"], serde_json::json!("EPSG:3035"));
    assert_eq!(doc["layers"].as_array().unwrap().len(), 4);
    assert_eq!(doc["layers"][1]["name"], serde_json::json!("countries"));
    assert_eq!(doc["layers"][1]["style"]["fill"]["visible"], serde_json::json!(false));
    assert_eq!(doc["layers"][3]["data"]["features"].as_array().unwrap().len(), 2);
    let labels: Vec<&str> = doc["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["text"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["1", "2"]);
}

#[test]
fn missing_csv_is_an_error() {
    let dir = region_dir();
    let cfg = ConfigOverrides {
        localities: Some("/nonexistent/points.csv".into()),
        ..overrides(dir.path())
    }
    .resolve()
    .unwrap();
    assert!(run(&cfg).is_err());
}

#[test]
fn catalog_lists_countries_from_region_dir() {
    let dir = region_dir();
    let groups = region_catalog(Some(dir.path()), Resolution::Small).unwrap();
    assert_eq!(groups["Europe"].len(), 7);
    assert!(region_catalog(Some(dir.path()), Resolution::Large).is_err());
}

#[test]
fn projects_single_point() {
    let p = project_point(&Crs::laea_europe(), 10.0, 52.0).unwrap();
    assert_close(p.x, 4_321_000.0, 1e-3);
    assert_close(p.y, 3_210_000.0, 1e-3);
}
