//! # Coverage Pipeline
//!
//! Runs the stages in their fixed order:
//!
//! ```text
//! Boundary -> Grid -> Vertices -> Sectors -> Index -> Intersections
//! ```
//!
//! Each stage materializes its whole output before the next one starts. All
//! metric work happens in planar coordinates; [`CoveragePipeline::run`]
//! reprojects the results to longitude/latitude at the end.

use std::collections::HashSet;

use config::CoverageConfig;
use pipeline_types::{Diagnostic, Stage};
use rayon::prelude::*;

use crate::boundary::Boundary;
use crate::error::Result;
use crate::grid::{GridBuilder, GridCell};
use crate::intersections::{IntersectionEngine, IntersectionRecord};
use crate::progress::{CancellationToken, NoProgress, ProgressObserver, RunContext};
use crate::projection::unproject_coord;
use crate::sectors::{Sector, SectorBatch, SectorBuilder};
use crate::spatial_index::SpatialIndex;
use crate::vertices::{Vertex, VertexExtractor};

/// Everything a coverage run produces.
#[derive(Debug, Clone, Default)]
pub struct CoverageOutput {
    pub grid: Vec<GridCell>,
    /// Every extracted vertex, in identifier order.
    pub vertices: Vec<Vertex>,
    pub sectors: Vec<Sector>,
    pub intersections: Vec<IntersectionRecord>,
    /// Entities skipped along the way, plus a note when the boundary
    /// was repaired.
    pub diagnostics: Vec<Diagnostic>,
}

/// Configured coverage run.
///
/// # Example
///
/// ```rust
/// use config::{AzimuthSpec, CoverageConfig};
/// use geo::polygon;
/// use sector_coverage::{Boundary, CoveragePipeline};
///
/// let boundary = Boundary::from_planar(polygon![
///     (x: 0.0, y: 0.0),
///     (x: 10_000.0, y: 0.0),
///     (x: 10_000.0, y: 10_000.0),
///     (x: 0.0, y: 10_000.0),
/// ])
/// .unwrap();
/// let config = CoverageConfig::new(5000.0, 3000.0, vec![AzimuthSpec::new(0)]).unwrap();
/// let output = CoveragePipeline::new(config).run_planar(&boundary).unwrap();
/// assert_eq!(output.grid.len(), 4);
/// ```
pub struct CoveragePipeline<'a> {
    config: CoverageConfig,
    observer: &'a dyn ProgressObserver,
    cancellation: CancellationToken,
}

impl CoveragePipeline<'static> {
    pub fn new(config: CoverageConfig) -> Self {
        Self {
            config,
            observer: &NoProgress,
            cancellation: CancellationToken::new(),
        }
    }
}

impl<'a> CoveragePipeline<'a> {
    /// Reports progress to `observer`.
    pub fn with_observer<'b>(self, observer: &'b dyn ProgressObserver) -> CoveragePipeline<'b> {
        CoveragePipeline {
            config: self.config,
            observer,
            cancellation: self.cancellation,
        }
    }

    /// Stops the run at the next checkpoint once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    fn context(&self) -> RunContext<'_> {
        RunContext::new(self.observer, self.cancellation.clone())
    }

    /// Runs every stage and returns geometry in planar Web Mercator meters.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or cancellation. Per-sector problems
    /// are returned as diagnostics instead.
    pub fn run_planar(&self, boundary: &Boundary) -> Result<CoverageOutput> {
        self.config.validate()?;
        let ctx = self.context();

        let mut diagnostics = Vec::new();
        if boundary.was_repaired() {
            diagnostics.push(Diagnostic::note(
                Stage::Boundary,
                "boundary was invalid and has been repaired",
            ));
        }

        let grid = GridBuilder::from_config(&self.config)?.build_planar(boundary, &ctx)?;
        let vertices = VertexExtractor::from_config(&self.config)?.extract(&grid, &ctx)?;
        let SectorBatch {
            sectors,
            diagnostics: skipped,
        } = SectorBuilder::from_config(&self.config)?.build(boundary, &vertices, &ctx)?;
        diagnostics.extend(skipped);

        ctx.cancellation.check(Stage::Index)?;
        let tracker = ctx.track(Stage::Index, vertices.len());
        let index = SpatialIndex::from_vertex_set(&vertices);
        tracker.finish(index.len());

        let intersections = IntersectionEngine::new(&index).run(&sectors, &ctx)?;
        diagnostics.extend(intersections.diagnostics);

        Ok(CoverageOutput {
            grid,
            vertices: vertices.as_slice().to_vec(),
            sectors,
            intersections: intersections.records,
            diagnostics,
        })
    }

    /// Runs every stage and returns geometry in longitude/latitude.
    ///
    /// A grid cell or vertex that fails to reproject aborts the run; a
    /// sector that fails is dropped with a diagnostic, together with its
    /// intersection record.
    pub fn run(&self, boundary: &Boundary) -> Result<CoverageOutput> {
        let planar = self.run_planar(boundary)?;
        let ctx = self.context();
        let tracker = ctx.track(Stage::Output, planar.grid.len());

        let grid = planar
            .grid
            .par_iter()
            .map(|cell| {
                tracker.tick()?;
                cell.to_geographic()
            })
            .collect::<Result<Vec<_>>>()?;
        let vertices = planar
            .vertices
            .par_iter()
            .map(|vertex| {
                Ok(Vertex {
                    id: vertex.id,
                    coord: unproject_coord(vertex.coord)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = SectorBatch {
            sectors: planar.sectors,
            diagnostics: planar.diagnostics,
        }
        .to_geographic();
        let kept: HashSet<_> = batch.sectors.iter().map(|sector| sector.id).collect();
        let intersections: Vec<IntersectionRecord> = planar
            .intersections
            .into_iter()
            .filter(|record| kept.contains(&record.sector_id))
            .collect();
        tracker.finish(grid.len());

        tracing::info!(
            cells = grid.len(),
            vertices = vertices.len(),
            sectors = batch.sectors.len(),
            intersections = intersections.len(),
            diagnostics = batch.diagnostics.len(),
            "Coverage run finished"
        );
        Ok(CoverageOutput {
            grid,
            vertices,
            sectors: batch.sectors,
            intersections,
            diagnostics: batch.diagnostics,
        })
    }
}

impl std::fmt::Debug for CoveragePipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoveragePipeline")
            .field("config", &self.config)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
