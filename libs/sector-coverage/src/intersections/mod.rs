//! # Intersection Engine
//!
//! Maps every sector to the vertices it covers.
//!
//! The broad phase queries the [`SpatialIndex`] with the sector's bounding
//! box. The narrow phase keeps a candidate when the point lies inside the
//! sector polygon or on its border, so the apex itself is always covered.
//! Sectors are independent and share the index read-only, so they are
//! processed on the rayon pool.

use geo::{BoundingRect, Intersects, Point};
use pipeline_types::{Diagnostic, EntityRef, Stage};
use rayon::prelude::*;

use crate::error::Result;
use crate::progress::RunContext;
use crate::sectors::{Sector, SectorId};
use crate::spatial_index::SpatialIndex;
use crate::vertices::VertexId;

/// The vertices covered by one sector.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionRecord {
    pub sector_id: SectorId,
    /// Apex vertex of the sector.
    pub vertex_id: VertexId,
    pub azimuth: i32,
    /// Covered vertices in ascending order.
    pub vertex_ids: Vec<VertexId>,
}

#[derive(Debug, Clone, Default)]
pub struct IntersectionBatch {
    pub records: Vec<IntersectionRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs sector/vertex membership tests against a shared index.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionEngine<'a> {
    index: &'a SpatialIndex,
}

impl<'a> IntersectionEngine<'a> {
    pub fn new(index: &'a SpatialIndex) -> Self {
        Self { index }
    }

    /// Computes one record per sector. Sectors and index must share a
    /// coordinate system.
    pub fn run(&self, sectors: &[Sector], ctx: &RunContext<'_>) -> Result<IntersectionBatch> {
        let tracker = ctx.track(Stage::Intersections, sectors.len());
        let outcomes = sectors
            .par_iter()
            .map(|sector| {
                tracker.tick()?;
                Ok(self.covered_by(sector))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut batch = IntersectionBatch::default();
        for outcome in outcomes {
            match outcome {
                Ok(record) => batch.records.push(record),
                Err(diagnostic) => {
                    tracing::warn!(%diagnostic, "Skipping sector");
                    batch.diagnostics.push(diagnostic);
                }
            }
        }
        tracker.finish(batch.records.len());

        let memberships: usize = batch.records.iter().map(|r| r.vertex_ids.len()).sum();
        tracing::info!(
            sectors = sectors.len(),
            records = batch.records.len(),
            memberships,
            "Intersections computed"
        );
        Ok(batch)
    }

    fn covered_by(&self, sector: &Sector) -> std::result::Result<IntersectionRecord, Diagnostic> {
        let bbox = sector.polygon.bounding_rect().ok_or_else(|| {
            Diagnostic::skipped(
                Stage::Intersections,
                EntityRef::Sector(sector.id.0),
                "sector polygon has no bounding box",
            )
        })?;
        let vertex_ids = self
            .index
            .query(&bbox)
            .into_iter()
            .filter(|vertex| sector.polygon.intersects(&Point::from(vertex.coord)))
            .map(|vertex| vertex.id)
            .collect();
        Ok(IntersectionRecord {
            sector_id: sector.id,
            vertex_id: sector.vertex_id,
            azimuth: sector.azimuth,
            vertex_ids,
        })
    }
}

/// Computes intersection records without progress reporting.
pub fn compute_intersections(sectors: &[Sector], index: &SpatialIndex) -> Result<IntersectionBatch> {
    IntersectionEngine::new(index).run(sectors, &RunContext::default())
}
