//! Validated run configuration for the coverage pipeline.
//!
//! Every tunable of a run travels in one `CoverageConfig` value that callers
//! pass explicitly into the pipeline stages. Nothing here reads the
//! environment or any global state.

use std::fmt;

use crate::constants::{
    DEFAULT_ARC_RESOLUTION, DEFAULT_BOUNDARY_EROSION_TOLERANCE, DEFAULT_VERTEX_PRECISION,
    MAX_AZIMUTHS, MAX_VERTEX_PRECISION, MIN_CELL_SIZE_METERS,
};

/// One configured coverage direction.
///
/// By convention the sector's start angle equals its azimuth; use
/// [`AzimuthSpec::with_start_angle`] to decouple them.
///
/// # Examples
/// ```
/// use config::AzimuthSpec;
/// let spec = AzimuthSpec::new(120);
/// assert_eq!(spec.start_angle, 120.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthSpec {
    /// Coverage direction in whole degrees, `[0, 360)`.
    pub azimuth: i32,
    /// Angle in degrees where the sector arc starts.
    pub start_angle: f64,
}

impl AzimuthSpec {
    /// Creates a spec whose start angle equals the azimuth.
    pub fn new(azimuth: i32) -> Self {
        Self {
            azimuth,
            start_angle: f64::from(azimuth),
        }
    }

    /// Overrides the start angle.
    pub fn with_start_angle(mut self, start_angle: f64) -> Self {
        self.start_angle = start_angle;
        self
    }
}

/// Immutable snapshot of all run parameters.
///
/// # Examples
/// ```
/// use config::{AzimuthSpec, CoverageConfig};
/// let cfg = CoverageConfig::new(5000.0, 3000.0, vec![AzimuthSpec::new(0)]).expect("valid config");
/// assert_eq!(cfg.arc_resolution, 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageConfig {
    /// Side length of a grid square, in planar meters.
    pub cell_size: f64,
    /// Lower bound enforced on `cell_size`.
    pub min_cell_size: f64,
    /// Sector radius, in planar meters.
    pub radius: f64,
    /// Between one and [`MAX_AZIMUTHS`] directions; repeats are allowed.
    pub azimuths: Vec<AzimuthSpec>,
    /// Number of segments approximating each sector arc.
    pub arc_resolution: u32,
    /// Inward erosion of the boundary before apex filtering, in meters.
    pub boundary_erosion_tolerance: f64,
    /// Decimal digits of the planar coordinate kept in the vertex dedup key.
    pub vertex_precision: u32,
}

impl CoverageConfig {
    /// Builds a configuration with default arc resolution, erosion tolerance
    /// and vertex precision, enforcing strict validation.
    ///
    /// # Examples
    /// ```
    /// use config::{AzimuthSpec, ConfigError, CoverageConfig};
    /// let err = CoverageConfig::new(100.0, 3000.0, vec![AzimuthSpec::new(0)]).unwrap_err();
    /// assert!(matches!(err, ConfigError::CellSizeBelowMinimum { .. }));
    /// ```
    pub fn new(cell_size: f64, radius: f64, azimuths: Vec<AzimuthSpec>) -> Result<Self, ConfigError> {
        let config = Self {
            cell_size,
            min_cell_size: MIN_CELL_SIZE_METERS,
            radius,
            azimuths,
            arc_resolution: DEFAULT_ARC_RESOLUTION,
            boundary_erosion_tolerance: DEFAULT_BOUNDARY_EROSION_TOLERANCE,
            vertex_precision: DEFAULT_VERTEX_PRECISION,
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with a different arc resolution.
    pub fn with_arc_resolution(mut self, arc_resolution: u32) -> Self {
        self.arc_resolution = arc_resolution;
        self
    }

    /// Returns a copy with a different boundary erosion tolerance.
    pub fn with_erosion_tolerance(mut self, tolerance: f64) -> Self {
        self.boundary_erosion_tolerance = tolerance;
        self
    }

    /// Returns a copy with a different minimum cell size.
    pub fn with_min_cell_size(mut self, min_cell_size: f64) -> Self {
        self.min_cell_size = min_cell_size;
        self
    }

    /// Returns a copy with a different vertex key precision.
    pub fn with_vertex_precision(mut self, digits: u32) -> Self {
        self.vertex_precision = digits;
        self
    }

    /// Checks every field. The `with_*` builders do not validate, so stage
    /// entry points call this before doing any work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::NonPositiveCellSize(self.cell_size));
        }
        if self.cell_size < self.min_cell_size {
            return Err(ConfigError::CellSizeBelowMinimum {
                cell_size: self.cell_size,
                minimum: self.min_cell_size,
            });
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::NonPositiveRadius(self.radius));
        }
        validate_azimuths(&self.azimuths)?;
        if self.arc_resolution < 1 {
            return Err(ConfigError::InvalidArcResolution(self.arc_resolution));
        }
        if !(self.boundary_erosion_tolerance.is_finite() && self.boundary_erosion_tolerance >= 0.0) {
            return Err(ConfigError::InvalidErosionTolerance(self.boundary_erosion_tolerance));
        }
        if self.vertex_precision > MAX_VERTEX_PRECISION {
            return Err(ConfigError::InvalidVertexPrecision(self.vertex_precision));
        }
        Ok(())
    }
}

/// Validates an azimuth list on its own.
///
/// # Examples
/// ```
/// use config::{validate_azimuths, AzimuthSpec};
/// assert!(validate_azimuths(&[AzimuthSpec::new(0), AzimuthSpec::new(120)]).is_ok());
/// assert!(validate_azimuths(&[AzimuthSpec::new(360)]).is_err());
/// ```
pub fn validate_azimuths(azimuths: &[AzimuthSpec]) -> Result<(), ConfigError> {
    if azimuths.is_empty() {
        return Err(ConfigError::NoAzimuths);
    }
    if azimuths.len() > MAX_AZIMUTHS {
        return Err(ConfigError::TooManyAzimuths(azimuths.len()));
    }
    for spec in azimuths {
        if !(0..360).contains(&spec.azimuth) {
            return Err(ConfigError::AzimuthOutOfRange(spec.azimuth));
        }
        if !spec.start_angle.is_finite() {
            return Err(ConfigError::NonFiniteStartAngle(spec.azimuth));
        }
    }
    Ok(())
}

/// Error returned when invalid configuration values are provided.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Raised when the cell size is zero, negative or not finite.
    NonPositiveCellSize(f64),
    /// Raised when the cell size is below the configured minimum.
    CellSizeBelowMinimum { cell_size: f64, minimum: f64 },
    /// Raised when the sector radius is zero, negative or not finite.
    NonPositiveRadius(f64),
    /// Raised when no azimuth is configured.
    NoAzimuths,
    /// Raised when more than [`MAX_AZIMUTHS`] azimuths are configured.
    TooManyAzimuths(usize),
    /// Raised when an azimuth lies outside `[0, 360)`.
    AzimuthOutOfRange(i32),
    /// Raised when an azimuth's start angle is NaN or infinite.
    NonFiniteStartAngle(i32),
    /// Raised when the arc resolution is below one segment.
    InvalidArcResolution(u32),
    /// Raised when the erosion tolerance is negative or not finite.
    InvalidErosionTolerance(f64),
    /// Raised when the vertex key precision exceeds [`MAX_VERTEX_PRECISION`].
    InvalidVertexPrecision(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveCellSize(value) => {
                write!(f, "cell_size must be positive: {value}")
            }
            ConfigError::CellSizeBelowMinimum { cell_size, minimum } => {
                write!(f, "cell_size {cell_size} is below the minimum of {minimum} meters")
            }
            ConfigError::NonPositiveRadius(value) => write!(f, "radius must be positive: {value}"),
            ConfigError::NoAzimuths => write!(f, "at least one azimuth is required"),
            ConfigError::TooManyAzimuths(count) => {
                write!(f, "at most {MAX_AZIMUTHS} azimuths are allowed, got {count}")
            }
            ConfigError::AzimuthOutOfRange(value) => {
                write!(f, "azimuth must be in [0, 360): {value}")
            }
            ConfigError::NonFiniteStartAngle(value) => {
                write!(f, "start angle of azimuth {value} is not finite")
            }
            ConfigError::InvalidArcResolution(value) => {
                write!(f, "arc_resolution must be >= 1: {value}")
            }
            ConfigError::InvalidErosionTolerance(value) => {
                write!(f, "boundary_erosion_tolerance must be >= 0: {value}")
            }
            ConfigError::InvalidVertexPrecision(value) => {
                write!(f, "vertex_precision must be <= {MAX_VERTEX_PRECISION}: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
