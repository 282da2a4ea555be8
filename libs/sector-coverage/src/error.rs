//! # Coverage Errors
//!
//! Error types for the coverage pipeline.
//!
//! ## Error Policy
//!
//! - Configuration, boundary and projection failures abort the whole run
//! - Failures confined to one sector are reported as
//!   [`Diagnostic`](pipeline_types::Diagnostic) records instead, and the
//!   batch continues without that sector

use config::ConfigError;
use pipeline_types::Stage;
use thiserror::Error;

/// Errors that can abort a coverage run.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Invalid run parameters
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Boundary is empty or could not be repaired
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Coordinate transform failed
    #[error("Projection error: {message}")]
    Projection { message: String },

    /// The caller cancelled the run
    #[error("Run cancelled during {stage} stage")]
    Cancelled { stage: Stage },

    /// Malformed GeoJSON input
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl CoverageError {
    /// Creates an invalid geometry error.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Creates a projection error.
    pub fn projection(message: impl Into<String>) -> Self {
        Self::Projection {
            message: message.into(),
        }
    }
}

/// Result type alias for coverage operations.
pub type Result<T> = std::result::Result<T, CoverageError>;
