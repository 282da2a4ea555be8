//! # Feature Collections
//!
//! Converts pipeline outputs to GeoJSON feature collections, the in-memory
//! form that storage and HTTP layers consume, and reads a boundary back
//! from GeoJSON text. Nothing here touches files or the network.

use std::collections::{BTreeMap, HashMap};

use geo::{Geometry, MultiPolygon, Point};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, Value};
use rayon::prelude::*;
use serde_json::json;

use crate::boundary::Boundary;
use crate::error::{CoverageError, Result};
use crate::grid::GridCell;
use crate::intersections::IntersectionRecord;
use crate::pipeline::CoverageOutput;
use crate::sectors::{Sector, SectorId};
use crate::vertices::Vertex;

pub const GRID_COLLECTION: &str = "grid";
pub const VERTICES_COLLECTION: &str = "vertices";
pub const SECTORS_COLLECTION: &str = "sectors";
pub const INTERSECTIONS_COLLECTION: &str = "intersections";

fn feature(geometry: Value, id: Option<u64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geometry)),
        id: id.map(|id| Id::Number(id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn properties(pairs: impl IntoIterator<Item = (&'static str, serde_json::Value)>) -> JsonObject {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub fn grid_features(cells: &[GridCell]) -> FeatureCollection {
    let features = cells
        .par_iter()
        .map(|cell| {
            feature(
                Value::from(&cell.polygon),
                None,
                properties([
                    ("column", json!(cell.column)),
                    ("row", json!(cell.row)),
                    ("kind", json!(cell.kind.as_str())),
                ]),
            )
        })
        .collect();
    collection(features)
}

pub fn vertex_features(vertices: &[Vertex]) -> FeatureCollection {
    let features = vertices
        .par_iter()
        .map(|vertex| {
            feature(
                Value::from(&Point::from(vertex.coord)),
                Some(vertex.id.0),
                properties([("vertex_id", json!(vertex.id.0))]),
            )
        })
        .collect();
    collection(features)
}

fn sector_properties(sector: &Sector) -> JsonObject {
    properties([
        ("sector_id", json!(sector.id.0)),
        ("vertex_id", json!(sector.vertex_id.0)),
        ("azimuth", json!(sector.azimuth)),
        ("start_angle", json!(sector.start_angle)),
        ("width", json!(sector.width)),
        ("radius", json!(sector.radius)),
    ])
}

pub fn sector_features(sectors: &[Sector]) -> FeatureCollection {
    let features = sectors
        .par_iter()
        .map(|sector| {
            feature(
                Value::from(&sector.polygon),
                Some(sector.id.0),
                sector_properties(sector),
            )
        })
        .collect();
    collection(features)
}

/// One feature per record, carrying the sector geometry and the covered
/// vertex identifiers. Records whose sector is missing are left out.
pub fn intersection_features(records: &[IntersectionRecord], sectors: &[Sector]) -> FeatureCollection {
    let by_id: HashMap<SectorId, &Sector> = sectors.iter().map(|s| (s.id, s)).collect();
    let features = records
        .par_iter()
        .filter_map(|record| {
            let sector = by_id.get(&record.sector_id)?;
            let mut props = sector_properties(sector);
            let covered: Vec<u64> = record.vertex_ids.iter().map(|id| id.0).collect();
            props.insert("vertex_ids".to_string(), json!(covered));
            Some(feature(Value::from(&sector.polygon), Some(record.sector_id.0), props))
        })
        .collect();
    collection(features)
}

/// All output collections keyed by collection name.
pub fn collections(output: &CoverageOutput) -> BTreeMap<&'static str, FeatureCollection> {
    BTreeMap::from([
        (GRID_COLLECTION, grid_features(&output.grid)),
        (VERTICES_COLLECTION, vertex_features(&output.vertices)),
        (SECTORS_COLLECTION, sector_features(&output.sectors)),
        (
            INTERSECTIONS_COLLECTION,
            intersection_features(&output.intersections, &output.sectors),
        ),
    ])
}

/// Parses a geographic boundary from GeoJSON text.
///
/// Accepts a geometry, feature or feature collection; every polygon and
/// multi-polygon found is merged into one boundary. Other geometry types
/// are ignored.
///
/// # Errors
///
/// - [`CoverageError::GeoJson`] for malformed text
/// - [`CoverageError::InvalidGeometry`] when no polygon is present or the
///   polygons cannot be repaired
pub fn boundary_from_geojson(text: &str) -> Result<Boundary> {
    let geojson: GeoJson = text.parse()?;
    let geometries = geojson::quick_collection::<f64>(&geojson)?;
    let mut polygons = Vec::new();
    for geometry in geometries {
        match geometry {
            Geometry::Polygon(polygon) => polygons.push(polygon),
            Geometry::MultiPolygon(multi) => polygons.extend(multi),
            other => tracing::debug!(?other, "Ignoring non-polygon boundary geometry"),
        }
    }
    if polygons.is_empty() {
        return Err(CoverageError::invalid_geometry("GeoJSON contains no polygon"));
    }
    Boundary::from_geographic(MultiPolygon::new(polygons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellKind;
    use crate::sectors::generate_sector;
    use crate::vertices::VertexId;
    use geo::{coord, polygon};

    fn sample_sector() -> Sector {
        let apex = coord! { x: 4.0, y: 50.0 };
        Sector {
            id: SectorId(6),
            vertex_id: VertexId(2),
            apex,
            azimuth: 0,
            start_angle: 0.0,
            width: 60.0,
            radius: 3000.0,
            polygon: generate_sector(apex, 0.02, 0.0, 60.0, 4),
        }
    }

    #[test]
    fn test_grid_feature_properties() {
        let cell = GridCell {
            column: 1,
            row: 2,
            kind: CellKind::Clipped,
            polygon: polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)],
        };
        let fc = grid_features(&[cell]);
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["column"], json!(1));
        assert_eq!(props["row"], json!(2));
        assert_eq!(props["kind"], json!("clipped"));
    }

    #[test]
    fn test_intersection_feature_carries_vertex_ids() {
        let sector = sample_sector();
        let record = IntersectionRecord {
            sector_id: SectorId(6),
            vertex_id: VertexId(2),
            azimuth: 0,
            vertex_ids: vec![VertexId(2), VertexId(7)],
        };
        let orphan = IntersectionRecord {
            sector_id: SectorId(99),
            ..record.clone()
        };
        let fc = intersection_features(&[record, orphan], &[sector]);
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["vertex_ids"], json!([2, 7]));
        assert_eq!(props["sector_id"], json!(6));
        assert_eq!(props["azimuth"], json!(0));
    }

    #[test]
    fn test_collections_are_keyed_by_name() {
        let output = CoverageOutput {
            sectors: vec![sample_sector()],
            vertices: vec![Vertex {
                id: VertexId(2),
                coord: coord! { x: 4.0, y: 50.0 },
            }],
            ..CoverageOutput::default()
        };
        let all = collections(&output);
        let names: Vec<&str> = all.keys().copied().collect();
        assert_eq!(names, vec!["grid", "intersections", "sectors", "vertices"]);
        assert_eq!(all["sectors"].features.len(), 1);
        assert!(all["grid"].features.is_empty());

        let text = all["vertices"].to_string();
        assert!(text.contains("\"vertex_id\":2"));
    }

    #[test]
    fn test_boundary_from_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": "test"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[4.0, 50.0], [4.2, 50.0], [4.2, 50.2], [4.0, 50.2], [4.0, 50.0]]]
                }
            }, {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Point", "coordinates": [4.1, 50.1]}
            }]
        }"#;
        let boundary = boundary_from_geojson(text).unwrap();
        assert!(!boundary.was_repaired());
        assert!(boundary.area() > 0.0);
    }

    #[test]
    fn test_boundary_from_geojson_errors() {
        let err = boundary_from_geojson("not json").unwrap_err();
        assert!(matches!(err, CoverageError::GeoJson(_)));

        let point = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        let err = boundary_from_geojson(point).unwrap_err();
        assert!(matches!(err, CoverageError::InvalidGeometry { .. }));
    }
}
