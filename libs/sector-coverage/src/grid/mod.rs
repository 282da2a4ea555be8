//! # Grid Builder
//!
//! Tiles the boundary's bounding box with fixed-size squares and clips each
//! square against the boundary.
//!
//! ## Algorithm
//!
//! 1. Step across the planar bounding box, columns outer and rows inner
//! 2. Squares whose box meets no border segment are either wholly inside
//!    (kept unmodified) or wholly outside (dropped); one point-in-polygon
//!    test on the center decides
//! 3. The remaining squares are clipped exactly; every non-empty piece
//!    becomes its own [`GridCell`]. Piece coordinates lying within
//!    [`LATTICE_SNAP_TOLERANCE`] of the square's edge lines are moved onto
//!    them, so neighbouring cells share corners bit for bit
//!
//! Squares are independent, so step 2 and 3 run on the rayon pool. The
//! ordered collect keeps the output identical to a sequential run.

use config::constants::{AREA_TOLERANCE, EPSILON, LATTICE_SNAP_TOLERANCE, MIN_CELL_SIZE_METERS};
use config::{ConfigError, CoverageConfig};
use geo::{coord, polygon, Area, BooleanOps, Coord, MapCoords, Polygon, Rect};
use pipeline_types::Stage;
use rayon::prelude::*;

use crate::boundary::Boundary;
use crate::error::Result;
use crate::progress::RunContext;
use crate::projection::{to_geographic, Crs};

/// Whether a cell is a whole grid square or a clipped piece of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Interior,
    Clipped,
}

impl CellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Interior => "interior",
            CellKind::Clipped => "clipped",
        }
    }
}

/// One polygon of the clipped grid.
///
/// Pieces of the same square share `column` and `row`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
    pub kind: CellKind,
    pub polygon: Polygon<f64>,
}

impl GridCell {
    pub fn is_interior(&self) -> bool {
        self.kind == CellKind::Interior
    }

    /// Returns the same cell with its polygon in longitude/latitude.
    pub fn to_geographic(&self) -> Result<GridCell> {
        Ok(GridCell {
            polygon: to_geographic(&self.polygon, Crs::WebMercator)?,
            ..self.clone()
        })
    }
}

/// Builds clipped square grids of one cell size.
#[derive(Debug, Clone, Copy)]
pub struct GridBuilder {
    cell_size: f64,
}

impl GridBuilder {
    /// Creates a builder, rejecting cell sizes below `min_cell_size`.
    pub fn new(cell_size: f64, min_cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(ConfigError::NonPositiveCellSize(cell_size).into());
        }
        if cell_size < min_cell_size {
            return Err(ConfigError::CellSizeBelowMinimum {
                cell_size,
                minimum: min_cell_size,
            }
            .into());
        }
        Ok(Self { cell_size })
    }

    pub fn from_config(config: &CoverageConfig) -> Result<Self> {
        Self::new(config.cell_size, config.min_cell_size)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Builds the grid in planar coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::Cancelled`](crate::CoverageError::Cancelled)
    /// if the run is cancelled while squares are being clipped.
    pub fn build_planar(&self, boundary: &Boundary, ctx: &RunContext<'_>) -> Result<Vec<GridCell>> {
        let Some(bbox) = boundary.bounding_rect() else {
            return Ok(Vec::new());
        };
        let columns = steps(bbox.width(), self.cell_size);
        let rows = steps(bbox.height(), self.cell_size);
        let squares: Vec<(u32, u32)> = (0..columns)
            .flat_map(|column| (0..rows).map(move |row| (column, row)))
            .collect();

        let tracker = ctx.track(Stage::Grid, squares.len());
        let pieces = squares
            .par_iter()
            .map(|&(column, row)| {
                tracker.tick()?;
                Ok(self.clip_square(boundary, bbox.min(), column, row))
            })
            .collect::<Result<Vec<_>>>()?;
        let cells: Vec<GridCell> = pieces.into_iter().flatten().collect();
        tracker.finish(cells.len());

        let interior = cells.iter().filter(|cell| cell.is_interior()).count();
        tracing::info!(
            cells = cells.len(),
            interior,
            clipped = cells.len() - interior,
            columns,
            rows,
            "Grid built"
        );
        Ok(cells)
    }

    /// Builds the grid and reprojects every cell to longitude/latitude.
    pub fn build(&self, boundary: &Boundary, ctx: &RunContext<'_>) -> Result<Vec<GridCell>> {
        self.build_planar(boundary, ctx)?
            .par_iter()
            .map(GridCell::to_geographic)
            .collect()
    }

    fn clip_square(&self, boundary: &Boundary, origin: Coord<f64>, column: u32, row: u32) -> Vec<GridCell> {
        let size = self.cell_size;
        // Corners come from lattice indices so neighbours share edges exactly
        let lattice = |column: u32, row: u32| coord! {
            x: origin.x + f64::from(column) * size,
            y: origin.y + f64::from(row) * size
        };
        let rect = Rect::new(lattice(column, row), lattice(column + 1, row + 1));
        let whole = || GridCell {
            column,
            row,
            kind: CellKind::Interior,
            polygon: square(&rect),
        };

        if !boundary.touches_rect(&rect) {
            return if boundary.contains(rect.center()) {
                vec![whole()]
            } else {
                Vec::new()
            };
        }

        let full_area = rect.width() * rect.height();
        let clipped = square(&rect).intersection(boundary.planar());
        if (full_area - clipped.unsigned_area()).abs() <= AREA_TOLERANCE * full_area {
            return vec![whole()];
        }
        clipped
            .0
            .into_iter()
            .map(|piece| snap_to_square(&piece, &rect))
            .filter(|piece| piece.unsigned_area() > 0.0)
            .map(|polygon| GridCell {
                column,
                row,
                kind: CellKind::Clipped,
                polygon,
            })
            .collect()
    }
}

/// Builds a geographic grid over `boundary` with the default minimum cell
/// size and no progress reporting.
pub fn build_grid(boundary: &Boundary, cell_size: f64) -> Result<Vec<GridCell>> {
    GridBuilder::new(cell_size, MIN_CELL_SIZE_METERS)?.build(boundary, &RunContext::default())
}

/// Counter-clockwise ring around `rect`, starting at its lower-left corner.
fn square(rect: &Rect<f64>) -> Polygon<f64> {
    let (min, max) = (rect.min(), rect.max());
    polygon![
        (x: min.x, y: min.y),
        (x: max.x, y: min.y),
        (x: max.x, y: max.y),
        (x: min.x, y: max.y),
    ]
}

/// Moves coordinates that sit within [`LATTICE_SNAP_TOLERANCE`] of an edge
/// line of `rect` exactly onto that line.
fn snap_to_square(piece: &Polygon<f64>, rect: &Rect<f64>) -> Polygon<f64> {
    let (min, max) = (rect.min(), rect.max());
    piece.map_coords(|c| coord! {
        x: snap(c.x, min.x, max.x),
        y: snap(c.y, min.y, max.y),
    })
}

fn snap(value: f64, low: f64, high: f64) -> f64 {
    if (value - low).abs() <= LATTICE_SNAP_TOLERANCE {
        low
    } else if (value - high).abs() <= LATTICE_SNAP_TOLERANCE {
        high
    } else {
        value
    }
}

/// Number of squares needed to cover `extent`, ignoring overshoot below
/// floating-point noise.
fn steps(extent: f64, cell_size: f64) -> u32 {
    ((extent / cell_size) - EPSILON).ceil().max(1.0) as u32
}

#[cfg(test)]
mod tests;
