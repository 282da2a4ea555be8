//! # Coverage CLI
//!
//! Runs the sector coverage pipeline over a boundary GeoJSON file and writes
//! each output collection to `<out-dir>/<collection>.geojson`.
//!
//! ## Usage
//!
//! ```text
//! coverage --boundary territory.geojson --cell-size 5000 --radius 3000 \
//!     --azimuth 0 --azimuth 120 --out-dir out/
//! ```
//!
//! Log verbosity follows `RUST_LOG` when set, otherwise INFO.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use config::constants::{DEFAULT_ARC_RESOLUTION, DEFAULT_BOUNDARY_EROSION_TOLERANCE, DEFAULT_VERTEX_PRECISION};
use config::{AzimuthSpec, CoverageConfig};
use sector_coverage::features::{boundary_from_geojson, collections};
use sector_coverage::{CoverageOutput, CoveragePipeline, LoggingProgress};
use tracing_subscriber::EnvFilter;

const DIAGNOSTICS_FILE: &str = "diagnostics.json";

#[derive(Parser, Debug)]
#[command(name = "coverage")]
#[command(about = "Grid, sector and coverage geometry for a territory boundary")]
struct Args {
    /// Boundary GeoJSON file (geometry, feature or feature collection)
    #[arg(long)]
    boundary: PathBuf,

    /// Grid square side length in meters
    #[arg(long)]
    cell_size: f64,

    /// Sector radius in meters
    #[arg(long)]
    radius: f64,

    /// Sector azimuth in degrees, repeat for up to three directions
    #[arg(long = "azimuth", required = true)]
    azimuths: Vec<i32>,

    /// Segments per sector arc
    #[arg(long, default_value_t = DEFAULT_ARC_RESOLUTION)]
    arc_resolution: u32,

    /// Inward boundary erosion before apex filtering, in meters
    #[arg(long, default_value_t = DEFAULT_BOUNDARY_EROSION_TOLERANCE)]
    erosion_tolerance: f64,

    /// Decimal digits kept when deduplicating vertices
    #[arg(long, default_value_t = DEFAULT_VERTEX_PRECISION)]
    vertex_precision: u32,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Directory receiving the output collections
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

impl Args {
    fn coverage_config(&self) -> Result<CoverageConfig, config::ConfigError> {
        let azimuths = self.azimuths.iter().copied().map(AzimuthSpec::new).collect();
        let config = CoverageConfig::new(self.cell_size, self.radius, azimuths)?
            .with_arc_resolution(self.arc_resolution)
            .with_erosion_tolerance(self.erosion_tolerance)
            .with_vertex_precision(self.vertex_precision);
        config.validate()?;
        Ok(config)
    }
}

fn write_outputs(output: &CoverageOutput, out_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(out_dir)?;
    for (name, collection) in collections(output) {
        let path = out_dir.join(format!("{name}.geojson"));
        fs::write(&path, collection.to_string())?;
        tracing::info!(path = %path.display(), features = collection.features.len(), "Wrote collection");
    }
    if !output.diagnostics.is_empty() {
        let path = out_dir.join(DIAGNOSTICS_FILE);
        fs::write(&path, serde_json::to_string_pretty(&output.diagnostics)?)?;
        tracing::warn!(
            path = %path.display(),
            count = output.diagnostics.len(),
            "Run produced diagnostics"
        );
    }
    Ok(())
}

/// `RUST_LOG`-style directives when given and valid, INFO otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    let args = Args::parse();
    let config = args.coverage_config()?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
    }

    tracing::info!(
        boundary = %args.boundary.display(),
        cell_size = config.cell_size,
        radius = config.radius,
        azimuths = ?args.azimuths,
        "Starting coverage run"
    );
    let started = Instant::now();

    let text = fs::read_to_string(&args.boundary)?;
    let boundary = boundary_from_geojson(&text)?;
    if boundary.was_repaired() {
        tracing::warn!("Boundary was repaired before processing");
    }

    let output = CoveragePipeline::new(config)
        .with_observer(&LoggingProgress)
        .run(&boundary)?;
    write_outputs(&output, &args.out_dir)?;

    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_repeated_azimuths_and_defaults() {
        let args = Args::try_parse_from([
            "coverage",
            "--boundary",
            "territory.geojson",
            "--cell-size",
            "5000",
            "--radius",
            "3000",
            "--azimuth",
            "0",
            "--azimuth",
            "120",
        ])
        .unwrap();
        assert_eq!(args.azimuths, vec![0, 120]);
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert_eq!(args.threads, None);

        let config = args.coverage_config().unwrap();
        assert_eq!(config.azimuths.len(), 2);
        assert_eq!(config.arc_resolution, DEFAULT_ARC_RESOLUTION);
        assert_eq!(config.boundary_erosion_tolerance, DEFAULT_BOUNDARY_EROSION_TOLERANCE);
    }

    #[test]
    fn test_azimuth_is_required() {
        let result = Args::try_parse_from([
            "coverage",
            "--boundary",
            "b.geojson",
            "--cell-size",
            "5000",
            "--radius",
            "3000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let args = Args::try_parse_from([
            "coverage",
            "--boundary",
            "b.geojson",
            "--cell-size",
            "5000",
            "--radius",
            "3000",
            "--azimuth",
            "0",
            "--arc-resolution",
            "0",
        ])
        .unwrap();
        assert!(matches!(
            args.coverage_config(),
            Err(config::ConfigError::InvalidArcResolution(0))
        ));
    }

    #[test]
    fn test_log_filter_honours_directives() {
        use tracing_subscriber::filter::LevelFilter;

        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_same_azimuth_twice_is_accepted() {
        let args = Args::try_parse_from([
            "coverage",
            "--boundary",
            "b.geojson",
            "--cell-size",
            "5000",
            "--radius",
            "3000",
            "--azimuth",
            "90",
            "--azimuth",
            "90",
        ])
        .unwrap();
        assert_eq!(args.coverage_config().unwrap().azimuths.len(), 2);
    }

    #[test]
    fn test_write_outputs_creates_collection_files() {
        let dir = std::env::temp_dir().join(format!("coverage-cli-test-{}", std::process::id()));
        write_outputs(&CoverageOutput::default(), &dir).unwrap();
        for name in ["grid", "vertices", "sectors", "intersections"] {
            let text = fs::read_to_string(dir.join(format!("{name}.geojson"))).unwrap();
            assert!(text.contains("FeatureCollection"));
        }
        assert!(!dir.join(DIAGNOSTICS_FILE).exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
