//! # Boundary
//!
//! The territory to tile, held in planar Web Mercator coordinates together
//! with an R-tree over its ring segments.
//!
//! ## Validation
//!
//! A boundary is accepted when it is non-empty, every ring has at least four
//! coordinates, every polygon has positive area and no two non-adjacent ring
//! segments cross or overlap. Otherwise one repair is attempted by
//! normalizing the geometry through a boolean self-union. If the result is
//! still invalid, construction fails with [`CoverageError::InvalidGeometry`].
//!
//! ## Segment index
//!
//! The segment tree answers two questions cheaply:
//!
//! - does a grid square touch the border at all ([`Boundary::touches_rect`])
//! - how far is a point from the border ([`Boundary::distance_to_border`]),
//!   which backs inward erosion without materializing a buffered polygon

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BooleanOps, BoundingRect, Contains, Coord, CoordsIter, Line, MultiPolygon, Point, Rect};
use glam::DVec2;
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{CoverageError, Result};
use crate::projection::{to_geographic, to_planar, Crs};

// =============================================================================
// SEGMENTS
// =============================================================================

/// One non-degenerate edge of a boundary ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundarySegment {
    pub line: Line<f64>,
    /// Ring number across all polygons, exteriors and holes alike.
    pub ring: usize,
    /// Position of the edge within its ring.
    pub position: usize,
    /// Number of edges in the ring.
    pub ring_len: usize,
}

impl BoundarySegment {
    /// Consecutive edges of one ring share an endpoint by construction.
    fn is_adjacent(&self, other: &Self) -> bool {
        if self.ring != other.ring {
            return false;
        }
        let low = self.position.min(other.position);
        let high = self.position.max(other.position);
        high - low == 1 || (low == 0 && high + 1 == self.ring_len)
    }

    /// Describes how this edge conflicts with `other`, if it does.
    fn conflict_with(&self, other: &Self) -> Option<Coord<f64>> {
        if self.is_adjacent(other) {
            return None;
        }
        match line_intersection(self.line, other.line)? {
            LineIntersection::SinglePoint {
                intersection,
                is_proper: true,
            } => Some(intersection),
            LineIntersection::SinglePoint { .. } => None,
            LineIntersection::Collinear { intersection } => {
                (intersection.start != intersection.end).then_some(intersection.start)
            }
        }
    }
}

impl RTreeObject for BoundarySegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x, self.line.start.y],
            [self.line.end.x, self.line.end.y],
        )
    }
}

impl PointDistance for BoundarySegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = DVec2::new(point[0], point[1]);
        let a = DVec2::new(self.line.start.x, self.line.start.y);
        let ab = DVec2::new(self.line.end.x, self.line.end.y) - a;
        let len2 = ab.length_squared();
        let t = if len2 > 0.0 {
            ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (a + ab * t).distance_squared(p)
    }
}

fn collect_segments(polygons: &MultiPolygon<f64>) -> Vec<BoundarySegment> {
    let mut segments = Vec::new();
    let rings = polygons
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()));
    for (ring, line_string) in rings.enumerate() {
        let lines: Vec<Line<f64>> = line_string.lines().filter(|l| l.start != l.end).collect();
        let ring_len = lines.len();
        segments.extend(lines.into_iter().enumerate().map(|(position, line)| BoundarySegment {
            line,
            ring,
            position,
            ring_len,
        }));
    }
    segments
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Returns a description of the first validity problem found, if any.
fn find_problem(polygons: &MultiPolygon<f64>, segments: &RTree<BoundarySegment>) -> Option<String> {
    if polygons.0.is_empty() {
        return Some("boundary is empty".to_string());
    }
    for (index, polygon) in polygons.0.iter().enumerate() {
        let short_ring = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .any(|ring| ring.0.len() < 4);
        if short_ring {
            return Some(format!("polygon {index} has a ring with fewer than 4 coordinates"));
        }
        if polygon.unsigned_area() <= 0.0 {
            return Some(format!("polygon {index} has zero area"));
        }
    }

    let all: Vec<&BoundarySegment> = segments.iter().collect();
    all.par_iter()
        .find_map_any(|segment| {
            segments
                .locate_in_envelope_intersecting(&segment.envelope())
                .filter(|other| (other.ring, other.position) > (segment.ring, segment.position))
                .find_map(|other| segment.conflict_with(other))
        })
        .map(|at| format!("ring segments cross near ({:.3}, {:.3})", at.x, at.y))
}

// =============================================================================
// BOUNDARY
// =============================================================================

/// A validated territory boundary in planar coordinates.
#[derive(Debug, Clone)]
pub struct Boundary {
    polygons: MultiPolygon<f64>,
    segments: RTree<BoundarySegment>,
    repaired: bool,
}

impl Boundary {
    /// Builds a boundary from longitude/latitude geometry.
    ///
    /// # Errors
    ///
    /// - [`CoverageError::InvalidGeometry`] when the geometry is empty or
    ///   cannot be repaired
    /// - [`CoverageError::Projection`] when a coordinate cannot be projected
    pub fn from_geographic(geometry: impl Into<MultiPolygon<f64>>) -> Result<Self> {
        let geometry = geometry.into();
        ensure_not_empty(&geometry)?;
        Self::validated(to_planar(&geometry, Crs::Geographic)?)
    }

    /// Builds a boundary from geometry already in Web Mercator meters.
    pub fn from_planar(geometry: impl Into<MultiPolygon<f64>>) -> Result<Self> {
        let geometry = geometry.into();
        ensure_not_empty(&geometry)?;
        Self::validated(to_planar(&geometry, Crs::WebMercator)?)
    }

    fn validated(polygons: MultiPolygon<f64>) -> Result<Self> {
        let segments = RTree::bulk_load(collect_segments(&polygons));
        let Some(problem) = find_problem(&polygons, &segments) else {
            tracing::debug!(
                polygons = polygons.0.len(),
                segments = segments.size(),
                "Boundary validated"
            );
            return Ok(Self {
                polygons,
                segments,
                repaired: false,
            });
        };

        tracing::warn!(%problem, "Boundary is invalid, attempting repair");
        let repaired = polygons.union(&MultiPolygon::new(Vec::new()));
        let segments = RTree::bulk_load(collect_segments(&repaired));
        if let Some(problem) = find_problem(&repaired, &segments) {
            return Err(CoverageError::invalid_geometry(format!(
                "boundary is invalid after repair: {problem}"
            )));
        }
        tracing::info!(polygons = repaired.0.len(), "Boundary repaired");
        Ok(Self {
            polygons: repaired,
            segments,
            repaired: true,
        })
    }

    /// The boundary polygons in planar coordinates.
    pub fn planar(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    /// Reprojects the boundary to longitude/latitude.
    pub fn to_geographic(&self) -> Result<MultiPolygon<f64>> {
        to_geographic(&self.polygons, Crs::WebMercator)
    }

    /// True when the input needed repair before it was accepted.
    pub fn was_repaired(&self) -> bool {
        self.repaired
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygons.bounding_rect()
    }

    /// Planar area in square meters.
    pub fn area(&self) -> f64 {
        self.polygons.unsigned_area()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.size()
    }

    /// Strict interior containment. Points on the border are outside.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        self.polygons.contains(&Point::from(coord))
    }

    /// True when the bounding box of some border segment meets `rect`.
    ///
    /// A `false` answer means `rect` lies entirely inside or entirely
    /// outside the boundary.
    pub fn touches_rect(&self, rect: &Rect<f64>) -> bool {
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        self.segments
            .locate_in_envelope_intersecting(&envelope)
            .next()
            .is_some()
    }

    /// Euclidean distance from `coord` to the nearest border segment.
    pub fn distance_to_border(&self, coord: Coord<f64>) -> Option<f64> {
        let point = [coord.x, coord.y];
        self.segments
            .nearest_neighbor(&point)
            .map(|segment| segment.distance_2(&point).sqrt())
    }

    /// Views the boundary shrunk inward by `tolerance` meters.
    pub fn eroded(&self, tolerance: f64) -> ErodedBoundary<'_> {
        ErodedBoundary {
            boundary: self,
            tolerance,
        }
    }
}

fn ensure_not_empty(geometry: &MultiPolygon<f64>) -> Result<()> {
    if geometry.coords_count() == 0 {
        Err(CoverageError::invalid_geometry("boundary is empty"))
    } else {
        Ok(())
    }
}

/// A boundary shrunk inward by a fixed distance.
#[derive(Debug, Clone, Copy)]
pub struct ErodedBoundary<'a> {
    boundary: &'a Boundary,
    tolerance: f64,
}

impl ErodedBoundary<'_> {
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// True when `coord` is strictly inside the boundary and farther than
    /// the tolerance from every border segment.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        self.boundary
            .distance_to_border(coord)
            .is_some_and(|distance| distance > self.tolerance)
            && self.boundary.contains(coord)
    }
}
