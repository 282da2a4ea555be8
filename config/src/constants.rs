//! # Configuration Constants
//!
//! Centralized constants for the sector coverage pipeline. Grid limits,
//! sector shape parameters, projection constants and precision values are
//! defined here.
//!
//! ## Categories
//!
//! - **Precision**: Step rounding and area tolerances
//! - **Grid**: Cell size limits
//! - **Sectors**: Angular width, azimuth count, arc sampling
//! - **Projection**: Web Mercator sphere parameters

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Slack subtracted from `extent / cell_size` before rounding up the number
/// of grid steps, so a bounding box that is an exact multiple of the cell
/// size never gains an extra sliver column or row.
///
/// ```rust
/// use config::constants::EPSILON;
///
/// let steps = ((10_000.0_f64 / 5000.0) - EPSILON).ceil();
/// assert_eq!(steps, 2.0);
/// ```
pub const EPSILON: f64 = 1e-9;

/// Relative tolerance used when comparing polygon areas.
///
/// A clipped grid square whose area differs from the full square by less
/// than `AREA_TOLERANCE * cell_size²` is treated as unclipped.
///
/// # Example
///
/// ```rust
/// use config::constants::AREA_TOLERANCE;
///
/// let full = 5000.0 * 5000.0;
/// let clipped = full - 1.0;
/// assert!((full - clipped) <= AREA_TOLERANCE * full);
/// ```
pub const AREA_TOLERANCE: f64 = 1e-6;

/// Default number of decimal digits kept in the vertex dedup key.
///
/// Planar coordinates are in meters, so 2 digits merges vertices closer than
/// a centimeter. Boolean clipping snaps coordinates to an integer grid sized
/// from the whole boundary, which shifts corners by a millimeter or more at
/// national extents; a millimeter key would split those corners in two.
///
/// # Example
///
/// ```rust
/// use config::constants::DEFAULT_VERTEX_PRECISION;
///
/// let merge_distance = 10f64.powi(-(DEFAULT_VERTEX_PRECISION as i32));
/// assert!((merge_distance - 0.01).abs() < 1e-12);
/// ```
pub const DEFAULT_VERTEX_PRECISION: u32 = 2;

/// Largest accepted vertex key precision.
///
/// Beyond this, quantized planar coordinates at national scale no longer fit
/// comfortably in an `i64`.
pub const MAX_VERTEX_PRECISION: u32 = 9;

// =============================================================================
// GRID CONSTANTS
// =============================================================================

/// Distance, in meters, within which a clipped cell coordinate is moved
/// onto the edge line of its grid square.
///
/// Pieces of neighbouring squares then agree exactly on shared lattice
/// lines, whatever rounding the clipping backend applied.
pub const LATTICE_SNAP_TOLERANCE: f64 = 0.01;

/// Smallest permitted grid cell size, in meters.
///
/// Keeps the number of candidate squares (and therefore vertices and
/// sectors) bounded for national-scale boundaries.
///
/// # Example
///
/// ```rust
/// use config::constants::MIN_CELL_SIZE_METERS;
///
/// let requested = 2500.0;
/// assert!(requested < MIN_CELL_SIZE_METERS);
/// ```
pub const MIN_CELL_SIZE_METERS: f64 = 5000.0;

// =============================================================================
// SECTOR CONSTANTS
// =============================================================================

/// Angular width of every sector, in degrees.
///
/// # Example
///
/// ```rust
/// use config::constants::SECTOR_WIDTH_DEGREES;
///
/// // Six sectors tile a full turn.
/// assert_eq!(360.0 / SECTOR_WIDTH_DEGREES, 6.0);
/// ```
pub const SECTOR_WIDTH_DEGREES: f64 = 60.0;

/// Maximum number of azimuths per candidate vertex.
pub const MAX_AZIMUTHS: usize = 3;

/// Default number of segments used to approximate a sector arc.
///
/// The arc is sampled at `DEFAULT_ARC_RESOLUTION + 1` evenly spaced angles.
///
/// # Example
///
/// ```rust
/// use config::constants::{DEFAULT_ARC_RESOLUTION, SECTOR_WIDTH_DEGREES};
///
/// let step = SECTOR_WIDTH_DEGREES / DEFAULT_ARC_RESOLUTION as f64;
/// assert_eq!(step, 6.0);
/// ```
pub const DEFAULT_ARC_RESOLUTION: u32 = 10;

/// Default inward erosion applied to the boundary before vertex filtering,
/// in meters.
///
/// Vertices closer than this to the border are not used as sector apexes.
pub const DEFAULT_BOUNDARY_EROSION_TOLERANCE: f64 = 1.0;

// =============================================================================
// PROJECTION CONSTANTS
// =============================================================================

/// Sphere radius of the Web Mercator projection (EPSG:3857), in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator projection, in degrees.
///
/// # Example
///
/// ```rust
/// use config::constants::MAX_MERCATOR_LATITUDE;
///
/// assert!(MAX_MERCATOR_LATITUDE < 90.0);
/// ```
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// EPSG code of the geographic coordinate system (WGS 84).
pub const GEOGRAPHIC_EPSG: u32 = 4326;

/// EPSG code of the planar coordinate system (Web Mercator).
pub const PLANAR_EPSG: u32 = 3857;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Normalizes an angle in degrees into `[0, 360)`.
///
/// # Example
///
/// ```rust
/// use config::constants::normalize_degrees;
///
/// assert_eq!(normalize_degrees(410.0), 50.0);
/// assert_eq!(normalize_degrees(-10.0), 350.0);
/// assert_eq!(normalize_degrees(360.0), 0.0);
/// ```
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
