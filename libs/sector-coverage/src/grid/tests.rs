//! Tests for grid tiling and clipping.

use super::*;
use crate::error::CoverageError;
use crate::progress::CancellationToken;
use approx::assert_relative_eq;
use geo::{BoundingRect, MultiPolygon};

fn planar_square(min: f64, max: f64) -> Polygon<f64> {
    polygon![
        (x: min, y: min),
        (x: max, y: min),
        (x: max, y: max),
        (x: min, y: max),
    ]
}

fn build(boundary: &Boundary, cell_size: f64) -> Vec<GridCell> {
    GridBuilder::new(cell_size, MIN_CELL_SIZE_METERS)
        .unwrap()
        .build_planar(boundary, &RunContext::default())
        .unwrap()
}

fn total_area(cells: &[GridCell]) -> f64 {
    cells.iter().map(|cell| cell.polygon.unsigned_area()).sum()
}

/// Every cell must lie inside the boundary.
fn assert_cells_inside(cells: &[GridCell], boundary: &Boundary) {
    for cell in cells {
        let inside = cell.polygon.intersection(boundary.planar()).unsigned_area();
        assert_relative_eq!(inside, cell.polygon.unsigned_area(), max_relative = 1e-6);
    }
}

// =============================================================================
// TILING TESTS
// =============================================================================

#[test]
fn test_square_boundary_gives_four_interior_cells() {
    let boundary = Boundary::from_planar(planar_square(0.0, 10_000.0)).unwrap();
    let cells = build(&boundary, 5000.0);

    let positions: Vec<(u32, u32)> = cells.iter().map(|c| (c.column, c.row)).collect();
    assert_eq!(positions, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    assert!(cells.iter().all(GridCell::is_interior));
    assert_eq!(cells[0].polygon, planar_square(0.0, 5000.0));
    assert_eq!(
        cells[3].polygon.exterior().0[0],
        coord! { x: 5000.0, y: 5000.0 }
    );
}

#[test]
fn test_triangle_boundary_is_clipped() {
    let triangle = polygon![
        (x: 0.0, y: 0.0),
        (x: 10_000.0, y: 0.0),
        (x: 0.0, y: 10_000.0),
    ];
    let boundary = Boundary::from_planar(triangle).unwrap();
    let cells = build(&boundary, 5000.0);

    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0].kind, CellKind::Interior);
    assert_eq!(cells[1].kind, CellKind::Clipped);
    assert_eq!(cells[2].kind, CellKind::Clipped);
    assert_relative_eq!(cells[1].polygon.unsigned_area(), 12.5e6, max_relative = 1e-6);
    assert_relative_eq!(total_area(&cells), boundary.area(), max_relative = 1e-6);
    assert_cells_inside(&cells, &boundary);
}

#[test]
fn test_l_shape_union_matches_boundary() {
    let l_shape = polygon![
        (x: 0.0, y: 0.0),
        (x: 23_000.0, y: 0.0),
        (x: 23_000.0, y: 7_500.0),
        (x: 8_200.0, y: 7_500.0),
        (x: 8_200.0, y: 19_000.0),
        (x: 0.0, y: 19_000.0),
    ];
    let boundary = Boundary::from_planar(l_shape).unwrap();
    let cells = build(&boundary, 5000.0);

    assert_relative_eq!(total_area(&cells), boundary.area(), max_relative = 1e-6);
    assert_cells_inside(&cells, &boundary);
    assert!(cells.iter().any(|c| c.kind == CellKind::Interior));
    assert!(cells.iter().any(|c| c.kind == CellKind::Clipped));
    // Squares beyond both arms fall outside
    assert!(!cells.iter().any(|c| c.column >= 2 && c.row >= 2));
}

#[test]
fn test_island_becomes_separate_cell() {
    let parts = MultiPolygon::new(vec![
        planar_square(0.0, 12_000.0),
        planar_square(20_000.0, 23_000.0),
    ]);
    let boundary = Boundary::from_planar(parts).unwrap();
    let cells = build(&boundary, 5000.0);

    assert_relative_eq!(total_area(&cells), boundary.area(), max_relative = 1e-6);
    let island: Vec<&GridCell> = cells.iter().filter(|c| c.column == 4 && c.row == 4).collect();
    assert_eq!(island.len(), 1);
    assert_eq!(island[0].kind, CellKind::Clipped);
    assert_relative_eq!(island[0].polygon.unsigned_area(), 9.0e6, max_relative = 1e-6);
}

#[test]
fn test_square_split_by_bay_yields_two_pieces() {
    // The arms only connect in the second column
    let c_shape = polygon![
        (x: 0.0, y: 0.0),
        (x: 6_000.0, y: 0.0),
        (x: 6_000.0, y: 5_000.0),
        (x: 0.0, y: 5_000.0),
        (x: 0.0, y: 4_000.0),
        (x: 5_500.0, y: 4_000.0),
        (x: 5_500.0, y: 1_000.0),
        (x: 0.0, y: 1_000.0),
    ];
    let boundary = Boundary::from_planar(c_shape).unwrap();
    let cells = build(&boundary, 5000.0);

    assert_relative_eq!(total_area(&cells), boundary.area(), max_relative = 1e-6);
    let first_column: Vec<&GridCell> = cells.iter().filter(|c| c.column == 0).collect();
    assert_eq!(first_column.len(), 2);
    for piece in first_column {
        assert_eq!(piece.kind, CellKind::Clipped);
        assert_relative_eq!(piece.polygon.unsigned_area(), 5.0e6, max_relative = 1e-6);
    }
    assert_eq!(cells.iter().filter(|c| c.column == 1).count(), 1);
}

// =============================================================================
// PARAMETER TESTS
// =============================================================================

#[test]
fn test_snap_moves_near_edge_coordinates() {
    let rect = Rect::new(
        coord! { x: 3_500_000.0, y: 6_200_000.0 },
        coord! { x: 3_505_000.0, y: 6_205_000.0 },
    );
    let piece = polygon![
        (x: 3_500_000.000_9, y: 6_199_999.999_4),
        (x: 3_504_999.999_2, y: 6_200_000.0),
        (x: 3_502_000.5, y: 6_204_999.98),
    ];
    let snapped = snap_to_square(&piece, &rect);
    let coords = &snapped.exterior().0;
    assert_eq!(coords[0], coord! { x: 3_500_000.0, y: 6_200_000.0 });
    assert_eq!(coords[1], coord! { x: 3_505_000.0, y: 6_200_000.0 });
    // Farther than the tolerance from any edge line
    assert_eq!(coords[2], coord! { x: 3_502_000.5, y: 6_204_999.98 });
}

/// Test clipped pieces far from the origin land exactly on lattice lines.
#[test]
fn test_clipped_pieces_share_exact_lattice_lines() {
    let boundary = Boundary::from_planar(polygon![
        (x: 3_412_345.678, y: 6_187_654.321),
        (x: 3_498_765.432, y: 6_171_234.567),
        (x: 3_531_111.111, y: 6_243_210.987),
        (x: 3_467_890.123, y: 6_262_468.135),
        (x: 3_409_876.543, y: 6_229_753.186),
    ])
    .unwrap();
    let size = 5000.0;
    let cells = build(&boundary, size);
    let origin = boundary.bounding_rect().unwrap().min();
    let lattice = |value: f64, start: f64| {
        let k = ((value - start) / size).round() as u32;
        start + f64::from(k) * size
    };

    let mut on_lines = 0;
    for cell in cells.iter().filter(|cell| !cell.is_interior()) {
        for c in cell.polygon.exterior().coords() {
            for (value, start) in [(c.x, origin.x), (c.y, origin.y)] {
                let line = lattice(value, start);
                if (value - line).abs() <= LATTICE_SNAP_TOLERANCE {
                    assert_eq!(value, line);
                    on_lines += 1;
                }
            }
        }
    }
    assert!(on_lines > 0);
    assert_relative_eq!(total_area(&cells), boundary.area(), max_relative = 1e-6);
}

#[test]
fn test_steps_ignores_noise() {
    assert_eq!(steps(10_000.0, 5000.0), 2);
    assert_eq!(steps(10_000.000_001, 5000.0), 2);
    assert_eq!(steps(10_001.0, 5000.0), 3);
    assert_eq!(steps(100.0, 5000.0), 1);
}

#[test]
fn test_cell_size_below_minimum_is_rejected() {
    let err = GridBuilder::new(1000.0, MIN_CELL_SIZE_METERS).unwrap_err();
    assert!(matches!(
        err,
        CoverageError::Configuration(ConfigError::CellSizeBelowMinimum { .. })
    ));
    assert!(GridBuilder::new(-5.0, 0.0).is_err());
    assert!(GridBuilder::new(f64::NAN, 0.0).is_err());
}

#[test]
fn test_cancelled_run_stops() {
    let boundary = Boundary::from_planar(planar_square(0.0, 10_000.0)).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RunContext::new(&crate::progress::NoProgress, token);
    let err = GridBuilder::new(5000.0, 5000.0)
        .unwrap()
        .build_planar(&boundary, &ctx)
        .unwrap_err();
    assert!(matches!(err, CoverageError::Cancelled { stage: Stage::Grid }));
}

#[test]
fn test_geographic_build_reprojects_cells() {
    let lon_lat = planar_square(5.0, 5.2);
    let boundary = Boundary::from_geographic(lon_lat).unwrap();
    let cells = build_grid(&boundary, 5000.0).unwrap();
    assert!(!cells.is_empty());
    for cell in &cells {
        let rect = cell.polygon.bounding_rect().unwrap();
        assert!(rect.min().x >= 5.0 - 1e-7 && rect.max().x <= 5.2 + 1e-7);
        assert!(rect.min().y >= 5.0 - 1e-7 && rect.max().y <= 5.2 + 1e-7);
    }
}
