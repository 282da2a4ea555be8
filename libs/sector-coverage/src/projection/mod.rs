//! # Projection
//!
//! Exact coordinate transforms between geographic WGS 84 (EPSG:4326) and
//! spherical Web Mercator (EPSG:3857). Every metric operation in the
//! pipeline (clipping, erosion, sector construction, containment) runs on
//! planar coordinates produced here.
//!
//! ## Example
//!
//! ```rust
//! use geo::Point;
//! use sector_coverage::projection::{to_geographic, to_planar, Crs};
//!
//! let p = Point::new(4.35, 50.85);
//! let planar = to_planar(&p, Crs::Geographic).unwrap();
//! let back = to_geographic(&planar, Crs::WebMercator).unwrap();
//! assert!((back.x() - p.x()).abs() < 1e-9);
//! ```

use std::f64::consts::FRAC_PI_4;

use config::constants::{EARTH_RADIUS_METERS, GEOGRAPHIC_EPSG, MAX_MERCATOR_LATITUDE, PLANAR_EPSG};
use geo::{Coord, CoordsIter, MapCoords};

use crate::error::{CoverageError, Result};

/// Supported coordinate reference systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326).
    Geographic,
    /// Spherical Web Mercator in meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// Resolves an EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            GEOGRAPHIC_EPSG => Ok(Crs::Geographic),
            PLANAR_EPSG => Ok(Crs::WebMercator),
            other => Err(CoverageError::projection(format!(
                "unsupported coordinate system EPSG:{other}"
            ))),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geographic => GEOGRAPHIC_EPSG,
            Crs::WebMercator => PLANAR_EPSG,
        }
    }
}

// =============================================================================
// COORDINATE TRANSFORMS
// =============================================================================

/// Projects one longitude/latitude coordinate to Web Mercator meters.
pub fn project_coord(coord: Coord<f64>) -> Result<Coord<f64>> {
    ensure_finite(coord)?;
    let (lon, lat) = (coord.x, coord.y);
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoverageError::projection(format!(
            "longitude {lon} is outside [-180, 180]"
        )));
    }
    if lat.abs() > MAX_MERCATOR_LATITUDE {
        return Err(CoverageError::projection(format!(
            "latitude {lat} is beyond the Web Mercator limit of {MAX_MERCATOR_LATITUDE}"
        )));
    }
    let x = EARTH_RADIUS_METERS * lon.to_radians();
    let y = EARTH_RADIUS_METERS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Ok(Coord { x, y })
}

/// Inverse of [`project_coord`].
pub fn unproject_coord(coord: Coord<f64>) -> Result<Coord<f64>> {
    ensure_finite(coord)?;
    let lon = (coord.x / EARTH_RADIUS_METERS).to_degrees();
    if lon.abs() > 180.0 + 1e-9 {
        return Err(CoverageError::projection(format!(
            "planar x {} maps outside the valid longitude range",
            coord.x
        )));
    }
    let lat = (2.0 * (coord.y / EARTH_RADIUS_METERS).exp().atan() - 2.0 * FRAC_PI_4).to_degrees();
    Ok(Coord {
        x: lon.clamp(-180.0, 180.0),
        y: lat,
    })
}

fn ensure_finite(coord: Coord<f64>) -> Result<Coord<f64>> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(coord)
    } else {
        Err(CoverageError::projection(format!(
            "non-finite coordinate ({}, {})",
            coord.x, coord.y
        )))
    }
}

// =============================================================================
// GEOMETRY TRANSFORMS
// =============================================================================

/// Converts `geom` from `source` into planar Web Mercator coordinates.
///
/// Planar input is returned unchanged after a finiteness check.
///
/// # Errors
///
/// Returns [`CoverageError::Projection`] for empty geometry, non-finite
/// coordinates, or coordinates outside the projection's domain.
pub fn to_planar<G>(geom: &G, source: Crs) -> Result<G>
where
    G: MapCoords<f64, f64, Output = G> + CoordsIter<Scalar = f64>,
{
    ensure_non_empty(geom)?;
    match source {
        Crs::Geographic => geom.try_map_coords(project_coord),
        Crs::WebMercator => geom.try_map_coords(ensure_finite),
    }
}

/// Converts `geom` from the planar system `planar` back into geographic
/// coordinates.
pub fn to_geographic<G>(geom: &G, planar: Crs) -> Result<G>
where
    G: MapCoords<f64, f64, Output = G> + CoordsIter<Scalar = f64>,
{
    ensure_non_empty(geom)?;
    match planar {
        Crs::WebMercator => geom.try_map_coords(unproject_coord),
        Crs::Geographic => geom.try_map_coords(ensure_finite),
    }
}

fn ensure_non_empty<G>(geom: &G) -> Result<()>
where
    G: CoordsIter<Scalar = f64>,
{
    if geom.coords_count() == 0 {
        Err(CoverageError::projection("geometry is empty"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests;
