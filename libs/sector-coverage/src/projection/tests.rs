//! Tests for the Web Mercator projection.

use super::*;
use approx::assert_abs_diff_eq;
use geo::{coord, polygon, LineString, Point, Polygon};
use std::f64::consts::PI;

/// Test the antimeridian and equator land on the expected planar values.
#[test]
fn test_project_known_values() {
    let origin = project_coord(coord! { x: 0.0, y: 0.0 }).unwrap();
    assert_abs_diff_eq!(origin.x, 0.0);
    assert_abs_diff_eq!(origin.y, 0.0, epsilon = 1e-9);

    let east = project_coord(coord! { x: 180.0, y: 0.0 }).unwrap();
    assert_abs_diff_eq!(east.x, PI * EARTH_RADIUS_METERS, epsilon = 1e-6);
}

#[test]
fn test_projection_limit_latitude_gives_square_world() {
    let top = project_coord(coord! { x: 0.0, y: MAX_MERCATOR_LATITUDE }).unwrap();
    assert_abs_diff_eq!(top.y, PI * EARTH_RADIUS_METERS, epsilon = 1e-3);
}

/// Test a geographic point survives a planar round trip.
#[test]
fn test_point_round_trip() {
    for (lon, lat) in [(4.35, 50.85), (-70.6, -33.45), (139.7, 35.7), (0.0, 0.0)] {
        let p = Point::new(lon, lat);
        let planar = to_planar(&p, Crs::Geographic).unwrap();
        let back = to_geographic(&planar, Crs::WebMercator).unwrap();
        assert_abs_diff_eq!(back.x(), lon, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y(), lat, epsilon = 1e-9);
    }
}

#[test]
fn test_polygon_round_trip_keeps_ring_shape() {
    let poly = polygon![
        (x: 10.0, y: 45.0),
        (x: 11.0, y: 45.0),
        (x: 11.0, y: 46.0),
        (x: 10.0, y: 46.0),
    ];
    let planar = to_planar(&poly, Crs::Geographic).unwrap();
    assert_eq!(planar.exterior().0.len(), poly.exterior().0.len());
    let back = to_geographic(&planar, Crs::WebMercator).unwrap();
    for (a, b) in back.exterior().coords().zip(poly.exterior().coords()) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
    }
}

#[test]
fn test_planar_source_is_identity() {
    let p = Point::new(1234.5, -987.25);
    let same = to_planar(&p, Crs::WebMercator).unwrap();
    assert_eq!(same, p);
}

// =============================================================================
// ERROR TESTS
// =============================================================================

#[test]
fn test_latitude_beyond_limit_fails() {
    let err = to_planar(&Point::new(0.0, 89.0), Crs::Geographic).unwrap_err();
    assert!(matches!(err, CoverageError::Projection { .. }));
}

#[test]
fn test_longitude_out_of_range_fails() {
    assert!(to_planar(&Point::new(181.0, 0.0), Crs::Geographic).is_err());
}

#[test]
fn test_non_finite_coordinate_fails() {
    assert!(to_planar(&Point::new(f64::NAN, 0.0), Crs::Geographic).is_err());
    assert!(to_planar(&Point::new(0.0, f64::INFINITY), Crs::WebMercator).is_err());
    assert!(to_geographic(&Point::new(f64::NAN, 0.0), Crs::WebMercator).is_err());
}

#[test]
fn test_empty_geometry_fails() {
    let empty = Polygon::new(LineString::new(vec![]), vec![]);
    let err = to_planar(&empty, Crs::Geographic).unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn test_unsupported_epsg_fails() {
    assert_eq!(Crs::from_epsg(4326).unwrap(), Crs::Geographic);
    assert_eq!(Crs::from_epsg(3857).unwrap(), Crs::WebMercator);
    let err = Crs::from_epsg(2154).unwrap_err();
    assert!(err.to_string().contains("EPSG:2154"));
}

#[test]
fn test_epsg_round_trip() {
    for crs in [Crs::Geographic, Crs::WebMercator] {
        assert_eq!(Crs::from_epsg(crs.epsg()).unwrap(), crs);
    }
}
