use foundation::{Crs, CrsError, Shape, Transformer};
use formats::LocalityDataset;
use geo::MapCoords;
use tracing::debug;

/// New dataset with every position carried into `target`. Labels,
/// categories and record order are unchanged.
pub fn reproject_dataset(dataset: &LocalityDataset, target: &Crs) -> Result<LocalityDataset, CrsError> {
    let transformer = Transformer::new(dataset.crs(), target);
    if transformer.is_identity() {
        return dataset.try_map_positions(target.clone(), Ok);
    }
    let out = dataset.try_map_positions(target.clone(), |c| transformer.transform(c))?;
    debug!(
        records = out.len(),
        from = %dataset.crs(),
        to = %target,
        "reprojected localities"
    );
    Ok(out)
}

/// New shape with every vertex carried into `target`.
pub fn reproject_shape(shape: &Shape, target: &Crs) -> Result<Shape, CrsError> {
    let transformer = Transformer::new(shape.crs(), target);
    if transformer.is_identity() {
        return Ok(Shape::new(shape.polygons().clone(), target.clone()));
    }
    let t = &transformer;
    let polygons = shape.polygons().try_map_coords(|c| t.transform(c))?;
    Ok(Shape::new(polygons, target.clone()))
}

#[cfg(test)]
mod tests {
    use super::{reproject_dataset, reproject_shape};
    use foundation::{BoundsSampling, Crs, Shape};
    use formats::LocalityDataset;
    use geo::{CoordsIter, polygon};
    use pretty_assertions::assert_eq;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn projects_tutorial_dataset() {
        let ds = LocalityDataset::from_records([(9.11, 33.08, "1", "A"), (15.13, 39.96, "2", "A")])
            .unwrap();
        let projected = reproject_dataset(&ds, &Crs::laea_europe()).unwrap();
        assert_eq!(projected.crs(), &Crs::laea_europe());
        assert_eq!(projected.len(), 2);
        for (before, after) in ds.iter().zip(projected.iter()) {
            assert!(after.x().is_finite() && after.y().is_finite());
            assert!(after.x() != before.x() && after.y() != before.y());
            assert_eq!(after.label(), before.label());
        }
        assert_close(projected.records()[0].x(), 4_236_789.46, 0.01);

        let back = reproject_dataset(&projected, &Crs::wgs84()).unwrap();
        assert_close(back.records()[1].x(), 15.13, 1e-9);
        assert_close(back.records()[1].y(), 39.96, 1e-9);
    }

    #[test]
    fn failing_point_fails_the_whole_dataset() {
        let ds = LocalityDataset::from_records([(9.0, 50.0, "ok", "A"), (-170.0, -52.0, "far", "A")])
            .unwrap();
        let err = reproject_dataset(&ds, &Crs::laea_europe()).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn projected_bounds_cover_every_projected_vertex() {
        let italy = polygon![
            (x: 7.0, y: 44.0), (x: 12.0, y: 37.0), (x: 18.5, y: 40.0),
            (x: 13.5, y: 46.5), (x: 7.0, y: 46.0)
        ];
        let shape = Shape::from_polygon(italy, Crs::wgs84());
        let target = Crs::laea_europe();
        let projected = reproject_shape(&shape, &target).unwrap();
        assert_eq!(projected.crs(), &target);

        let bbox = shape
            .bounding_box()
            .unwrap()
            .reproject(&target, BoundsSampling::default())
            .unwrap();
        assert!(projected.polygons().coords_iter().all(|c| bbox.contains(c)));
    }

    #[test]
    fn identity_keeps_geometry() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0)];
        let shape = Shape::from_polygon(square, Crs::wgs84());
        let same = reproject_shape(&shape, &Crs::parse("+proj=longlat +datum=WGS84").unwrap()).unwrap();
        assert_eq!(same.polygons(), shape.polygons());
    }
}
