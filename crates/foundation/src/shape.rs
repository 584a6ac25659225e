use geo::{Area, BoundingRect, MultiPolygon, Polygon};

use crate::bounds::BoundingBox;
use crate::crs::Crs;

/// Polygonal geometry together with the CRS its coordinates are in.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    crs: Crs,
    polygons: MultiPolygon<f64>,
}

impl Shape {
    pub fn new(polygons: MultiPolygon<f64>, crs: Crs) -> Self {
        Self { crs, polygons }
    }

    pub fn from_polygon(polygon: Polygon<f64>, crs: Crs) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]), crs)
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    pub fn into_polygons(self) -> MultiPolygon<f64> {
        self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    /// Planar area in squared CRS units (square degrees for geographic CRSs).
    pub fn area(&self) -> f64 {
        self.polygons.unsigned_area()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let rect = self.polygons.bounding_rect()?;
        BoundingBox::from_coords([rect.min(), rect.max()], self.crs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Shape;
    use crate::crs::Crs;
    use geo::{MultiPolygon, polygon};

    #[test]
    fn square_area_and_bounds() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 10.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0)];
        let shape = Shape::from_polygon(square, Crs::laea_europe());
        assert_eq!(shape.area(), 100.0);
        let bbox = shape.bounding_box().unwrap();
        assert_eq!([bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax()], [0.0, 0.0, 10.0, 10.0]);
        assert_eq!(bbox.crs(), &Crs::laea_europe());
    }

    #[test]
    fn empty_shape_has_no_bounds() {
        let shape = Shape::new(MultiPolygon::new(vec![]), Crs::wgs84());
        assert!(shape.is_empty());
        assert!(shape.bounding_box().is_none());
        assert_eq!(shape.area(), 0.0);
    }
}
