use foundation::{Crs, Shape};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::locality::LocalityDataset;

/// One administrative unit read from a country layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub name: String,
    pub continent: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

const NAME_KEYS: &[&str] = &["NAME", "ADMIN", "name", "admin", "NAME_EN", "name_en"];
const CONTINENT_KEYS: &[&str] = &["CONTINENT", "continent"];

/// Parses a FeatureCollection of Polygon/MultiPolygon features.
pub fn parse_region_features(payload: &str) -> Result<Vec<RegionFeature>, GeoJsonError> {
    let value: Value = serde_json::from_str(payload)?;
    region_features_from_value(value)
}

pub fn region_features_from_value(value: Value) -> Result<Vec<RegionFeature>, GeoJsonError> {
    let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or(GeoJsonError::NotAFeatureCollection)?;
    if ty != "FeatureCollection" {
        return Err(GeoJsonError::NotAFeatureCollection);
    }

    let features_val = obj
        .get("features")
        .and_then(|v| v.as_array())
        .ok_or(GeoJsonError::NotAFeatureCollection)?;

    let mut features = Vec::with_capacity(features_val.len());
    for (index, feat_val) in features_val.iter().enumerate() {
        let invalid = |reason: String| GeoJsonError::InvalidFeature { index, reason };

        let feat_obj = feat_val
            .as_object()
            .ok_or_else(|| invalid("feature must be an object".to_string()))?;
        let feat_type = feat_obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("feature missing type".to_string()))?;
        if feat_type != "Feature" {
            return Err(invalid(format!("unexpected feature type: {feat_type}")));
        }

        let properties = feat_obj
            .get("properties")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let name = first_string(&properties, NAME_KEYS)
            .ok_or_else(|| invalid("feature has no NAME/ADMIN property".to_string()))?;
        let continent = first_string(&properties, CONTINENT_KEYS);

        let geometry_val = feat_obj
            .get("geometry")
            .ok_or_else(|| invalid("feature missing geometry".to_string()))?;
        let geometry = parse_area_geometry(geometry_val).map_err(invalid)?;

        features.push(RegionFeature {
            name,
            continent,
            properties,
            geometry,
        });
    }

    Ok(features)
}

/// Point FeatureCollection with `label`/`category` properties.
///
/// Non-geographic datasets carry a named `crs` member so consumers do not
/// mistake planar metres for degrees.
pub fn localities_to_geojson(dataset: &LocalityDataset) -> Value {
    let features = dataset
        .iter()
        .map(|r| {
            let mut props = Map::new();
            props.insert("label".to_string(), Value::String(r.label().to_string()));
            props.insert(
                "category".to_string(),
                Value::String(r.category().to_string()),
            );
            feature(
                props,
                geometry_value("Point", coord_value(r.position())),
            )
        })
        .collect();
    feature_collection(features, dataset.crs())
}

/// Single-feature collection holding `shape` as a MultiPolygon.
pub fn shape_to_geojson(shape: &Shape, properties: Map<String, Value>) -> Value {
    let coords = shape
        .polygons()
        .iter()
        .map(|poly| {
            let mut rings = vec![ring_value(poly.exterior())];
            rings.extend(poly.interiors().iter().map(ring_value));
            Value::Array(rings)
        })
        .collect();
    let geom = geometry_value("MultiPolygon", Value::Array(coords));
    feature_collection(vec![feature(properties, geom)], shape.crs())
}

fn feature_collection(features: Vec<Value>, crs: &Crs) -> Value {
    let mut root = Map::new();
    root.insert(
        "type".to_string(),
        Value::String("FeatureCollection".to_string()),
    );
    if !crs.is_geographic() {
        let mut props = Map::new();
        props.insert("name".to_string(), Value::String(crs.id().to_string()));
        let mut named = Map::new();
        named.insert("type".to_string(), Value::String("name".to_string()));
        named.insert("properties".to_string(), Value::Object(props));
        root.insert("crs".to_string(), Value::Object(named));
    }
    root.insert("features".to_string(), Value::Array(features));
    Value::Object(root)
}

fn feature(properties: Map<String, Value>, geometry: Value) -> Value {
    let mut fobj = Map::new();
    fobj.insert("type".to_string(), Value::String("Feature".to_string()));
    fobj.insert("properties".to_string(), Value::Object(properties));
    fobj.insert("geometry".to_string(), geometry);
    Value::Object(fobj)
}

fn geometry_value(ty: &str, coordinates: Value) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(ty.to_string()));
    obj.insert("coordinates".to_string(), coordinates);
    Value::Object(obj)
}

fn coord_value(c: Coord<f64>) -> Value {
    Value::Array(vec![Value::from(c.x), Value::from(c.y)])
}

fn ring_value(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| coord_value(*c)).collect())
}

fn first_string(properties: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| properties.get(*k))
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_area_geometry(value: &Value) -> Result<MultiPolygon<f64>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Polygon" => Ok(MultiPolygon::new(vec![parse_polygon(coords)?])),
        "MultiPolygon" => parse_multi_polygon(coords),
        other => Err(format!("unsupported geometry type for a region: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<Coord<f64>, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(Coord { x: lon, y: lat })
}

fn parse_ring(coords: &Value) -> Result<LineString<f64>, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(parse_position(item)?);
    }
    if out.len() < 3 {
        return Err(format!("ring needs at least 3 positions, got {}", out.len()));
    }
    Ok(LineString::new(out))
}

fn parse_polygon(coords: &Value) -> Result<Polygon<f64>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    let mut parsed = Vec::with_capacity(rings.len());
    for ring in rings {
        parsed.push(parse_ring(ring)?);
    }
    let mut iter = parsed.into_iter();
    let exterior = iter
        .next()
        .ok_or("Polygon needs an exterior ring".to_string())?;
    Ok(Polygon::new(exterior, iter.collect()))
}

fn parse_multi_polygon(coords: &Value) -> Result<MultiPolygon<f64>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    let mut out = Vec::with_capacity(polys.len());
    for poly in polys {
        out.push(parse_polygon(poly)?);
    }
    Ok(MultiPolygon::new(out))
}

#[cfg(test)]
mod tests {
    use super::{GeoJsonError, localities_to_geojson, parse_region_features, shape_to_geojson};
    use crate::locality::LocalityDataset;
    use foundation::{Crs, Shape};
    use geo::polygon;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    #[test]
    fn parses_polygon_and_multipolygon_features() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"NAME": "Square", "CONTINENT": "Europe"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"name": "Pair"},
                    "geometry": {"type": "MultiPolygon", "coordinates": [
                        [[[0, 0], [1, 0], [1, 1], [0, 0]]],
                        [[[5, 5], [6, 5], [6, 6], [5, 5]]]
                    ]}
                }
            ]
        })
        .to_string();

        let features = parse_region_features(&payload).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name, "Square");
        assert_eq!(features[0].continent.as_deref(), Some("Europe"));
        assert_eq!(features[0].geometry.0.len(), 1);
        assert_eq!(features[1].continent, None);
        assert_eq!(features[1].geometry.0.len(), 2);
    }

    #[test]
    fn rejects_point_regions_and_bad_collections() {
        let point = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"NAME": "P"},
                          "geometry": {"type": "Point", "coordinates": [0, 0]}}]
        })
        .to_string();
        let err = parse_region_features(&point).unwrap_err();
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));

        let err = parse_region_features(r#"{"type": "Feature"}"#).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));

        let err = parse_region_features("{").unwrap_err();
        assert!(matches!(err, GeoJsonError::Json(_)));
    }

    #[test]
    fn exports_localities_with_crs_member_when_projected() {
        let ds = LocalityDataset::from_records([(9.11, 33.08, "1", "A")]).unwrap();
        let geographic = localities_to_geojson(&ds);
        assert!(geographic.get("crs").is_none());
        assert_eq!(
            geographic["features"][0],
            json!({
                "type": "Feature",
                "properties": {"label": "1", "category": "A"},
                "geometry": {"type": "Point", "coordinates": [9.11, 33.08]}
            })
        );

        let projected = ds
            .try_map_positions::<()>(Crs::laea_europe(), |c| Ok(c))
            .unwrap();
        let value = localities_to_geojson(&projected);
        assert_eq!(value["crs"]["properties"]["name"], json!("EPSG:3035"));
    }

    #[test]
    fn exports_shapes_as_multipolygons() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0)];
        let value = shape_to_geojson(&Shape::from_polygon(square, Crs::wgs84()), Map::new());
        let geom = &value["features"][0]["geometry"];
        assert_eq!(geom["type"], json!("MultiPolygon"));
        // geo closes rings on construction.
        assert_eq!(geom["coordinates"][0][0].as_array().unwrap().len(), 5);
    }
}
