//! # Sector Coverage
//!
//! Grid, sector and coverage geometry for directional coverage planning
//! over a national territory.
//!
//! ## Architecture
//!
//! ```text
//! Boundary → GridBuilder → VertexExtractor → SectorBuilder → SpatialIndex → IntersectionEngine
//! ```
//!
//! ## Algorithms
//!
//! All metric work runs in spherical Web Mercator (EPSG:3857):
//! - **Grid**: Square tiling with R-tree pruning of wholly inside/outside
//!   squares and boolean clipping of the rest
//! - **Vertices**: Quantized-key deduplication with first-seen identifiers
//! - **Sectors**: Sampled arcs at apexes inside the eroded boundary
//! - **Intersections**: R-tree broad phase, boundary-inclusive
//!   point-in-polygon narrow phase
//!
//! ## Usage
//!
//! ```rust,ignore
//! use config::{AzimuthSpec, CoverageConfig};
//! use sector_coverage::{features, Boundary, CoveragePipeline};
//!
//! let boundary = features::boundary_from_geojson(&text)?;
//! let config = CoverageConfig::new(5000.0, 3000.0, vec![AzimuthSpec::new(0)])?;
//! let output = CoveragePipeline::new(config).run(&boundary)?;
//! ```

pub mod boundary;
pub mod error;
pub mod features;
pub mod grid;
pub mod intersections;
pub mod pipeline;
pub mod progress;
pub mod projection;
pub mod sectors;
pub mod spatial_index;
pub mod vertices;

pub use boundary::{Boundary, ErodedBoundary};
pub use error::{CoverageError, Result};
pub use grid::{build_grid, CellKind, GridBuilder, GridCell};
pub use intersections::{compute_intersections, IntersectionBatch, IntersectionEngine, IntersectionRecord};
pub use pipeline::{CoverageOutput, CoveragePipeline};
pub use progress::{CancellationToken, LoggingProgress, NoProgress, ProgressObserver, RunContext};
pub use projection::{to_geographic, to_planar, Crs};
pub use sectors::{create_sectors, create_sectors_for_vertices, generate_sector, Sector, SectorBatch, SectorBuilder, SectorId};
pub use spatial_index::SpatialIndex;
pub use vertices::{extract_vertices, Vertex, VertexExtractor, VertexId, VertexSet};
