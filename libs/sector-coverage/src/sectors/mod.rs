//! # Sector Builder
//!
//! Builds pie-slice polygons anchored at grid vertices.
//!
//! ## Geometry
//!
//! A sector ring is `[apex, arc_0, ..., arc_n, apex]` where the arc samples
//! sit at `start + width * i / n` degrees for `i` in `0..=n`, measured
//! counter-clockwise from the +x axis. Angles past 360 are not wrapped
//! inside the arc, so a sector starting at 350 sweeps through 0 to 50
//! instead of folding back on itself.
//!
//! ## Apex filtering
//!
//! Only vertices strictly inside the boundary eroded by the configured
//! tolerance become apexes. Each kept apex gets one sector per configured
//! azimuth.

use std::fmt;

use config::constants::{normalize_degrees, MAX_AZIMUTHS, SECTOR_WIDTH_DEGREES};
use config::{AzimuthSpec, CoverageConfig};
use geo::{coord, Coord, LineString, Polygon};
use glam::DVec2;
use pipeline_types::{Diagnostic, EntityRef, Stage};
use rayon::prelude::*;

use crate::boundary::Boundary;
use crate::error::Result;
use crate::grid::GridCell;
use crate::progress::RunContext;
use crate::projection::{to_planar, unproject_coord, Crs};
use crate::vertices::{Vertex, VertexExtractor, VertexId, VertexSet};

/// Stable sector identifier derived from the apex vertex and azimuth slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectorId(pub u64);

impl SectorId {
    pub fn new(vertex: VertexId, slot: usize) -> Self {
        SectorId(vertex.0 * MAX_AZIMUTHS as u64 + slot as u64)
    }

    /// The vertex this sector is anchored at.
    pub fn vertex(&self) -> VertexId {
        VertexId(self.0 / MAX_AZIMUTHS as u64)
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub id: SectorId,
    pub vertex_id: VertexId,
    pub apex: Coord<f64>,
    /// Configured coverage direction, `[0, 360)`.
    pub azimuth: i32,
    pub start_angle: f64,
    pub width: f64,
    pub radius: f64,
    pub polygon: Polygon<f64>,
}

impl Sector {
    /// Returns the same sector with apex and ring in longitude/latitude.
    pub fn to_geographic(&self) -> Result<Sector> {
        Ok(Sector {
            apex: unproject_coord(self.apex)?,
            polygon: crate::projection::to_geographic(&self.polygon, Crs::WebMercator)?,
            ..self.clone()
        })
    }
}

/// Sectors that were built plus diagnostics for the ones that were skipped.
#[derive(Debug, Clone, Default)]
pub struct SectorBatch {
    pub sectors: Vec<Sector>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SectorBatch {
    /// Reprojects every sector to longitude/latitude. Sectors that fail to
    /// reproject are dropped with a diagnostic.
    pub fn to_geographic(self) -> SectorBatch {
        let mut diagnostics = self.diagnostics;
        let results: Vec<_> = self.sectors.par_iter().map(|s| (s.id, s.to_geographic())).collect();
        let mut sectors = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(sector) => sectors.push(sector),
                Err(err) => {
                    tracing::warn!(sector = %id, error = %err, "Skipping sector that failed to reproject");
                    diagnostics.push(Diagnostic::skipped(
                        Stage::Output,
                        EntityRef::Sector(id.0),
                        err.to_string(),
                    ));
                }
            }
        }
        SectorBatch {
            sectors,
            diagnostics,
        }
    }
}

// =============================================================================
// SECTOR GEOMETRY
// =============================================================================

/// Builds a pie-slice polygon.
///
/// Angles are in degrees. `arc_resolution` is the number of arc segments and
/// is raised to 1 if zero.
///
/// # Example
///
/// ```rust
/// use geo::{coord, Area};
/// use sector_coverage::sectors::generate_sector;
///
/// let sector = generate_sector(coord! { x: 0.0, y: 0.0 }, 10.0, 0.0, 60.0, 6);
/// assert_eq!(sector.exterior().0.len(), 9);
/// assert!((sector.unsigned_area() - 52.36).abs() < 0.5);
/// ```
pub fn generate_sector(
    center: Coord<f64>,
    radius: f64,
    start_angle: f64,
    width: f64,
    arc_resolution: u32,
) -> Polygon<f64> {
    let segments = arc_resolution.max(1);
    let start = normalize_degrees(start_angle);
    let apex = DVec2::new(center.x, center.y);

    let mut ring = Vec::with_capacity(segments as usize + 3);
    ring.push(center);
    ring.extend((0..=segments).map(|i| {
        let theta = (start + width * f64::from(i) / f64::from(segments)).to_radians();
        let p = apex + DVec2::from_angle(theta) * radius;
        coord! { x: p.x, y: p.y }
    }));
    ring.push(center);
    Polygon::new(LineString::new(ring), vec![])
}

// =============================================================================
// SECTOR BUILDER
// =============================================================================

/// Builds sectors for every eligible apex and configured azimuth.
#[derive(Debug, Clone)]
pub struct SectorBuilder {
    radius: f64,
    azimuths: Vec<AzimuthSpec>,
    arc_resolution: u32,
    erosion_tolerance: f64,
}

impl SectorBuilder {
    pub fn from_config(config: &CoverageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            radius: config.radius,
            azimuths: config.azimuths.clone(),
            arc_resolution: config.arc_resolution,
            erosion_tolerance: config.boundary_erosion_tolerance,
        })
    }

    /// Builds planar sectors for the planar `vertices` that lie inside the
    /// eroded boundary.
    pub fn build(&self, boundary: &Boundary, vertices: &VertexSet, ctx: &RunContext<'_>) -> Result<SectorBatch> {
        let eroded = boundary.eroded(self.erosion_tolerance);
        let tracker = ctx.track(Stage::Sectors, vertices.len());
        let per_vertex = vertices
            .as_slice()
            .par_iter()
            .map(|vertex| {
                tracker.tick()?;
                if !eroded.contains(vertex.coord) {
                    return Ok(Vec::new());
                }
                Ok(self
                    .azimuths
                    .iter()
                    .enumerate()
                    .map(|(slot, spec)| self.sector_for(vertex, slot, spec))
                    .collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>>>()?;

        let apexes = per_vertex.iter().filter(|built| !built.is_empty()).count();
        let mut batch = SectorBatch::default();
        for outcome in per_vertex.into_iter().flatten() {
            match outcome {
                Ok(sector) => batch.sectors.push(sector),
                Err(diagnostic) => {
                    tracing::warn!(%diagnostic, "Skipping sector");
                    batch.diagnostics.push(diagnostic);
                }
            }
        }
        tracker.finish(batch.sectors.len());
        tracing::info!(
            candidates = vertices.len(),
            apexes,
            sectors = batch.sectors.len(),
            skipped = batch.diagnostics.len(),
            "Sectors built"
        );
        Ok(batch)
    }

    fn sector_for(&self, vertex: &Vertex, slot: usize, spec: &AzimuthSpec) -> std::result::Result<Sector, Diagnostic> {
        let id = SectorId::new(vertex.id, slot);
        let polygon = generate_sector(
            vertex.coord,
            self.radius,
            spec.start_angle,
            SECTOR_WIDTH_DEGREES,
            self.arc_resolution,
        );
        let finite = polygon
            .exterior()
            .coords()
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !finite {
            return Err(Diagnostic::skipped(
                Stage::Sectors,
                EntityRef::Sector(id.0),
                format!("sector ring around vertex {} has non-finite coordinates", vertex.id),
            ));
        }
        Ok(Sector {
            id,
            vertex_id: vertex.id,
            apex: vertex.coord,
            azimuth: spec.azimuth,
            start_angle: spec.start_angle,
            width: SECTOR_WIDTH_DEGREES,
            radius: self.radius,
            polygon,
        })
    }
}

/// Builds planar sectors for an already extracted planar vertex set.
pub fn create_sectors_for_vertices(
    boundary: &Boundary,
    vertices: &VertexSet,
    config: &CoverageConfig,
    ctx: &RunContext<'_>,
) -> Result<SectorBatch> {
    SectorBuilder::from_config(config)?.build(boundary, vertices, ctx)
}

/// Builds geographic sectors from a geographic grid.
///
/// The grid is projected, its vertices extracted and filtered, and the
/// resulting sectors reprojected to longitude/latitude.
pub fn create_sectors(boundary: &Boundary, grid: &[GridCell], config: &CoverageConfig) -> Result<SectorBatch> {
    let ctx = RunContext::default();
    let planar_cells = grid
        .par_iter()
        .map(|cell| {
            Ok(GridCell {
                polygon: to_planar(&cell.polygon, Crs::Geographic)?,
                ..cell.clone()
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let vertices = VertexExtractor::from_config(config)?.extract(&planar_cells, &ctx)?;
    Ok(create_sectors_for_vertices(boundary, &vertices, config, &ctx)?.to_geographic())
}
