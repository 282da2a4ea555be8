//! # Vertex Extraction
//!
//! Collects the distinct ring coordinates of a polygon collection and gives
//! each a stable [`VertexId`].
//!
//! Coordinates are deduplicated on a quantized key: the planar coordinate
//! rounded to a fixed number of decimal digits, whose unit is the merge
//! distance. A coordinate joins the vertex already holding its key, or
//! else the nearest vertex closer than the merge distance in one of the
//! eight neighbouring keys, so two coordinates straddling a rounding
//! boundary still merge. No two distinct vertices end up closer than the
//! merge distance.
//!
//! Identifiers are handed out in first-seen order while walking cells, then
//! rings (exterior first), then coordinates, so the same cell collection
//! always yields the same assignment.

use std::collections::HashMap;
use std::fmt;

use config::constants::{DEFAULT_VERTEX_PRECISION, MAX_VERTEX_PRECISION};
use config::{ConfigError, CoverageConfig};
use geo::{Coord, Polygon};
use pipeline_types::Stage;

use crate::error::Result;
use crate::grid::GridCell;
use crate::progress::RunContext;
use crate::projection::{unproject_coord, Crs};

/// Stable identifier of an extracted vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub coord: Coord<f64>,
}

/// Dedup key: a coordinate scaled by `10^precision` and rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexKey {
    x: i64,
    y: i64,
}

impl VertexKey {
    pub fn quantize(coord: Coord<f64>, precision: u32) -> Self {
        let scale = 10f64.powi(precision as i32);
        Self {
            x: (coord.x * scale).round() as i64,
            y: (coord.y * scale).round() as i64,
        }
    }

    /// The eight surrounding keys.
    fn neighbours(self) -> impl Iterator<Item = VertexKey> {
        (-1..=1)
            .flat_map(|dx| (-1..=1).map(move |dy| (dx, dy)))
            .filter(|&offset| offset != (0, 0))
            .map(move |(dx, dy)| VertexKey {
                x: self.x + dx,
                y: self.y + dy,
            })
    }
}

/// Deduplicated vertices in identifier order, with a coordinate lookup.
#[derive(Debug, Clone)]
pub struct VertexSet {
    vertices: Vec<Vertex>,
    /// Key to identifier and the planar coordinate that claimed the key.
    lookup: HashMap<VertexKey, (VertexId, Coord<f64>)>,
    precision: u32,
    crs: Crs,
}

impl VertexSet {
    fn with_precision(precision: u32) -> Self {
        Self {
            vertices: Vec::new(),
            lookup: HashMap::new(),
            precision,
            crs: Crs::WebMercator,
        }
    }

    /// Smallest distance between two distinct vertices, in coordinate units.
    pub fn merge_distance(&self) -> f64 {
        10f64.powi(-(self.precision as i32))
    }

    fn insert(&mut self, coord: Coord<f64>) {
        if self.id_of(coord).is_some() {
            return;
        }
        let id = VertexId(self.vertices.len() as u64);
        self.lookup
            .insert(VertexKey::quantize(coord, self.precision), (id, coord));
        self.vertices.push(Vertex { id, coord });
    }

    /// Looks up the identifier of the vertex `coord` merges into: the one
    /// holding its key, else the nearest one closer than
    /// [`merge_distance`](Self::merge_distance). Ties go to the lower id.
    pub fn id_of(&self, coord: Coord<f64>) -> Option<VertexId> {
        let key = VertexKey::quantize(coord, self.precision);
        if let Some(&(id, _)) = self.lookup.get(&key) {
            return Some(id);
        }
        let merge = self.merge_distance();
        key.neighbours()
            .filter_map(|neighbour| self.lookup.get(&neighbour).copied())
            .filter_map(|(id, planar)| {
                let distance = (planar.x - coord.x).hypot(planar.y - coord.y);
                (distance < merge).then_some((distance, id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }

    pub fn get(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(usize::try_from(id.0).ok()?)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vertex> {
        self.vertices.iter()
    }

    pub fn as_slice(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Coordinate system of the stored coordinates.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Reprojects every vertex to longitude/latitude, keeping identifiers.
    ///
    /// The lookup keeps answering for the original planar coordinates.
    pub fn to_geographic(&self) -> Result<VertexSet> {
        if self.crs == Crs::Geographic {
            return Ok(self.clone());
        }
        let vertices = self
            .vertices
            .iter()
            .map(|vertex| {
                Ok(Vertex {
                    id: vertex.id,
                    coord: unproject_coord(vertex.coord)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            vertices,
            lookup: self.lookup.clone(),
            precision: self.precision,
            crs: Crs::Geographic,
        })
    }
}

impl<'a> IntoIterator for &'a VertexSet {
    type Item = &'a Vertex;
    type IntoIter = std::slice::Iter<'a, Vertex>;

    fn into_iter(self) -> Self::IntoIter {
        self.vertices.iter()
    }
}

/// Extracts vertex sets at a fixed key precision.
#[derive(Debug, Clone, Copy)]
pub struct VertexExtractor {
    precision: u32,
}

impl Default for VertexExtractor {
    fn default() -> Self {
        Self {
            precision: DEFAULT_VERTEX_PRECISION,
        }
    }
}

impl VertexExtractor {
    pub fn new(precision: u32) -> Result<Self> {
        if precision > MAX_VERTEX_PRECISION {
            return Err(ConfigError::InvalidVertexPrecision(precision).into());
        }
        Ok(Self { precision })
    }

    pub fn from_config(config: &CoverageConfig) -> Result<Self> {
        Self::new(config.vertex_precision)
    }

    /// Extracts vertices from planar grid cells.
    pub fn extract(&self, cells: &[GridCell], ctx: &RunContext<'_>) -> Result<VertexSet> {
        let tracker = ctx.track(Stage::Vertices, cells.len());
        let mut set = VertexSet::with_precision(self.precision);
        for cell in cells {
            tracker.tick()?;
            insert_polygon(&mut set, &cell.polygon);
        }
        tracker.finish(set.len());
        tracing::debug!(cells = cells.len(), vertices = set.len(), "Vertices extracted");
        Ok(set)
    }

    /// Extracts vertices from arbitrary planar polygons.
    pub fn extract_polygons<'p>(&self, polygons: impl IntoIterator<Item = &'p Polygon<f64>>) -> VertexSet {
        let mut set = VertexSet::with_precision(self.precision);
        for polygon in polygons {
            insert_polygon(&mut set, polygon);
        }
        set
    }
}

fn insert_polygon(set: &mut VertexSet, polygon: &Polygon<f64>) {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        for coord in ring.coords() {
            set.insert(*coord);
        }
    }
}

/// Extracts vertices from planar cells with the default key precision.
pub fn extract_vertices(cells: &[GridCell]) -> VertexSet {
    VertexExtractor::default().extract_polygons(cells.iter().map(|cell| &cell.polygon))
}
