//! Fixtures shared by the scenario tests via `mod helpers;`.

// Each scenario binary compiles its own copy and uses a subset.
#![allow(dead_code)]

use scanfill::{
    ActiveEdges, Bounds, EdgeTable, FillMode, FillOptions, MaskGrid, Parallelism, Point, RawPath,
    ScanRegion, SOLID_ROUNDING_UNIT,
};

pub fn polygon(v: &[(f32, f32)]) -> RawPath {
    let pts: Vec<Point> = v.iter().map(|&(x, y)| Point::new(x, y)).collect();
    RawPath::from_polygon(&pts, true)
}

/// Regular polygon approximating a circle.
pub fn circle(cx: f32, cy: f32, r: f32, sides: usize) -> RawPath {
    let pts: Vec<Point> = (0..sides)
        .map(|k| {
            let theta = (k as f32) * 2.0 * std::f32::consts::PI / sides as f32;
            Point::new(cx + r * theta.cos(), cy + r * theta.sin())
        })
        .collect();
    RawPath::from_polygon(&pts, true)
}

/// A destination comfortably larger than every test shape.
pub fn dest() -> Bounds {
    Bounds { min_x: -200.0, min_y: -200.0, max_x: 200.0, max_y: 200.0 }
}

pub fn options(mode: FillMode) -> FillOptions {
    FillOptions { mode, parallelism: Parallelism::Sequential }
}

pub fn solid_grid(path: &RawPath, mode: FillMode) -> MaskGrid {
    let region = ScanRegion::from_bounds(path.bounds(), &dest())
        .unwrap()
        .unwrap();
    let grid = MaskGrid::new(&region);
    let done = scanfill::fill_path_solid(path, &dest(), &options(mode), None, &grid).unwrap();
    assert!(done);
    grid
}

/// Span boundaries of a single row, produced the way a context seeded
/// at first row `y` would: edges alive before the row are interior,
/// edges whose endpoints land on it are entering/leaving.
pub fn scan_row<A: ActiveEdges>(path: &RawPath, y: f64) -> Vec<f64> {
    let table = EdgeTable::build(path, SOLID_ROUNDING_UNIT);
    let y_prev = y - 1.0;
    let mut active = A::with_capacity(table.len());
    for &i in table.sorted_by_start() {
        let e = &table.edges()[i as usize];
        if f64::from(e.y_start) <= y_prev && f64::from(e.y_end) > y_prev {
            active.enter(i);
        }
    }
    active.remove_leaving();
    for &i in table.sorted_by_start() {
        let e = &table.edges()[i as usize];
        if f64::from(e.y_start) > y_prev && f64::from(e.y_start) <= y {
            active.enter(i);
        }
    }
    for &i in table.sorted_by_end() {
        let e = &table.edges()[i as usize];
        if f64::from(e.y_end) > y_prev && f64::from(e.y_end) <= y {
            active.leave(i);
        }
    }
    let mut out = Vec::new();
    active.scan_line(y, &table, &mut out);
    out
}
