//! # Config Crate
//!
//! Centralized configuration for the sector coverage pipeline.
//! All magic numbers and tunable parameters are defined here so the grid,
//! sector and intersection stages share one source of truth.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{MIN_CELL_SIZE_METERS, SECTOR_WIDTH_DEGREES};
//! use config::{AzimuthSpec, CoverageConfig};
//!
//! let cfg = CoverageConfig::new(MIN_CELL_SIZE_METERS, 3000.0, vec![AzimuthSpec::new(0)])
//!     .expect("valid config");
//! assert_eq!(cfg.cell_size, 5000.0);
//! assert_eq!(SECTOR_WIDTH_DEGREES, 60.0);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **Explicit**: Run parameters are passed as values, never read globally
//! - **Validated**: Invalid configurations are rejected before any work starts

pub mod constants;
pub mod coverage;

pub use coverage::{validate_azimuths, AzimuthSpec, ConfigError, CoverageConfig};
