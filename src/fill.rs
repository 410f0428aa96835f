//! Fill drivers: iterate rows sequentially or dispatch row ranges
//! across the rayon pool, forwarding completed scanlines to the
//! color-application consumer through the sink seams.

use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::debug;
use rayon::prelude::*;
use thiserror::Error;

use crate::active::{ActiveEdges, AlternateActiveEdges, FillMode, NonZeroActiveEdges};
use crate::edge::EdgeTable;
use crate::path::{Bounds, RawPath};
use crate::scanner::{AaScannerContext, SolidScannerContext};
use crate::{AA_ROUNDING_UNIT, SOLID_ROUNDING_UNIT};

/// Fatal fill failures. Degenerate geometry is never an error; it is
/// filtered where it occurs.
#[derive(Debug, Error)]
pub enum FillError {
    /// A coordinate does not fit the pixel-index domain. Deliberately
    /// not clamped: clamping would silently corrupt geometry.
    #[error("coordinate {0} overflows the pixel index range")]
    CoordinateOverflow(f64),
}

/// Cooperative cancellation flag, checked between rows. A cancelled
/// fill stops early and reports `Ok(false)`; whatever rows were already
/// delivered stay delivered.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn is_cancelled(cancel: Option<&CancelFlag>) -> bool {
    cancel.map_or(false, CancelFlag::is_cancelled)
}

const MAX_PIXEL_INDEX: f64 = (i32::MAX / 2) as f64;

fn pixel_floor(v: f32) -> Result<i32, FillError> {
    let v = f64::from(v);
    if !v.is_finite() || v.abs() > MAX_PIXEL_INDEX {
        return Err(FillError::CoordinateOverflow(v));
    }
    Ok(v.floor() as i32)
}

fn pixel_ceil(v: f32) -> Result<i32, FillError> {
    let v = f64::from(v);
    if !v.is_finite() || v.abs() > MAX_PIXEL_INDEX {
        return Err(FillError::CoordinateOverflow(v));
    }
    Ok(v.ceil() as i32)
}

/// The destination-clipped scan area: rows `[top, bottom)` and a pixel
/// row of `width` columns starting at column `left`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScanRegion {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub width: usize,
}

impl ScanRegion {
    /// Intersect path bounds with the destination surface. `None` when
    /// the intersection is empty; overflow and NaN surface as errors
    /// here, at the float-to-index conversion.
    pub fn from_bounds(path: &Bounds, dest: &Bounds) -> Result<Option<ScanRegion>, FillError> {
        if path.is_empty() || dest.is_empty() {
            return Ok(None);
        }
        // Checked before intersecting: min/max against the destination
        // would swallow poisoned path bounds.
        if !path.is_finite() {
            return Err(FillError::CoordinateOverflow(f64::NAN));
        }
        let min_x = path.min_x.max(dest.min_x);
        let min_y = path.min_y.max(dest.min_y);
        let max_x = path.max_x.min(dest.max_x);
        let max_y = path.max_y.min(dest.max_y);
        if !(min_x <= max_x && min_y <= max_y) {
            return Ok(None);
        }
        let top = pixel_floor(min_y)?;
        let bottom = pixel_floor(max_y)?.checked_add(1).unwrap_or(i32::MAX);
        let left = pixel_floor(min_x)?;
        let right = pixel_ceil(max_x)?;
        let width = (right - left).max(1) as usize;
        Ok(Some(ScanRegion { top, bottom, left, width }))
    }

    pub fn rows(&self) -> i32 {
        self.bottom - self.top
    }
}

/// One finished aliased row.
#[derive(Debug)]
pub struct SolidScanline<'a> {
    pub row: i32,
    pub left: i32,
    pub mask: &'a crate::buffer::ScanlineMask,
    /// Inclusive dirty column range, relative to `left`.
    pub min_column: i32,
    pub max_column: i32,
}

/// One finished anti-aliased row.
#[derive(Debug)]
pub struct CoverageScanline<'a> {
    pub row: i32,
    pub left: i32,
    pub coverage: &'a [f32],
    pub min_column: i32,
    pub max_column: i32,
}

/// Consumer of aliased rows. Rows may arrive from multiple threads and
/// in any order; each row index is delivered at most once.
pub trait SolidSink: Sync {
    fn solid_scanline(&self, scanline: SolidScanline<'_>);
}

/// Consumer of anti-aliased rows; same delivery contract as
/// [`SolidSink`].
pub trait CoverageSink: Sync {
    fn coverage_scanline(&self, scanline: CoverageScanline<'_>);
}

/// Row-dispatch policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Parallelism {
    /// Parallel when the region is big enough to pay for the pool.
    Auto,
    Sequential,
    Parallel,
}

impl Default for Parallelism {
    fn default() -> Parallelism {
        Parallelism::Auto
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct FillOptions {
    pub mode: FillMode,
    pub parallelism: Parallelism,
}

// Fills narrower or shorter than this run sequentially under Auto;
// pool dispatch costs more than it saves on small regions.
const PARALLEL_MIN_WIDTH: usize = 256;
const PARALLEL_MIN_ROWS: i32 = 64;

const PARALLEL_CHUNK_ROWS: i32 = 32;

fn should_parallelize(region: &ScanRegion, parallelism: Parallelism) -> bool {
    match parallelism {
        Parallelism::Sequential => false,
        Parallelism::Parallel => region.rows() > 1,
        Parallelism::Auto => {
            region.width >= PARALLEL_MIN_WIDTH && region.rows() >= PARALLEL_MIN_ROWS
        }
    }
}

fn row_chunks(region: &ScanRegion) -> Vec<(i32, i32)> {
    let mut ranges = Vec::new();
    let mut row = region.top;
    while row < region.bottom {
        let end = region.bottom.min(row + PARALLEL_CHUNK_ROWS);
        ranges.push((row, end));
        row = end;
    }
    ranges
}

/// Worker result: cancellation propagates as a short-circuit, not an
/// error.
enum Stop {
    Cancelled,
}

/// Fill `[region.top, region.bottom)` from a prebuilt Solid-unit edge
/// table. `Ok(false)` means the fill was cancelled after delivering a
/// prefix of the rows.
pub fn fill_region_solid<S>(
    table: &EdgeTable,
    region: &ScanRegion,
    options: &FillOptions,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<bool, FillError>
where
    S: SolidSink + ?Sized,
{
    match options.mode {
        FillMode::Alternate => {
            run_solid::<AlternateActiveEdges, S>(table, region, options, cancel, sink)
        }
        FillMode::NonZero => run_solid::<NonZeroActiveEdges, S>(table, region, options, cancel, sink),
    }
}

/// Fill from a prebuilt AntiAliasing-unit edge table.
pub fn fill_region_aa<S>(
    table: &EdgeTable,
    region: &ScanRegion,
    options: &FillOptions,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<bool, FillError>
where
    S: CoverageSink + ?Sized,
{
    match options.mode {
        FillMode::Alternate => {
            run_aa::<AlternateActiveEdges, S>(table, region, options, cancel, sink)
        }
        FillMode::NonZero => run_aa::<NonZeroActiveEdges, S>(table, region, options, cancel, sink),
    }
}

/// Build the edge table and fill the path clipped to `dest` with 1-bit
/// coverage.
pub fn fill_path_solid<S>(
    path: &RawPath,
    dest: &Bounds,
    options: &FillOptions,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<bool, FillError>
where
    S: SolidSink + ?Sized,
{
    let region = match ScanRegion::from_bounds(path.bounds(), dest)? {
        Some(region) => region,
        None => return Ok(true),
    };
    let table = EdgeTable::build(path, SOLID_ROUNDING_UNIT);
    if table.is_empty() {
        return Ok(true);
    }
    fill_region_solid(&table, &region, options, cancel, sink)
}

/// Build the edge table and fill the path clipped to `dest` with f32
/// coverage.
pub fn fill_path_aa<S>(
    path: &RawPath,
    dest: &Bounds,
    options: &FillOptions,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<bool, FillError>
where
    S: CoverageSink + ?Sized,
{
    let region = match ScanRegion::from_bounds(path.bounds(), dest)? {
        Some(region) => region,
        None => return Ok(true),
    };
    let table = EdgeTable::build(path, AA_ROUNDING_UNIT);
    if table.is_empty() {
        return Ok(true);
    }
    fill_region_aa(&table, &region, options, cancel, sink)
}

fn run_solid<A, S>(
    table: &EdgeTable,
    region: &ScanRegion,
    options: &FillOptions,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<bool, FillError>
where
    A: ActiveEdges,
    S: SolidSink + ?Sized,
{
    if should_parallelize(region, options.parallelism) {
        let chunks = row_chunks(region);
        debug!(
            "solid fill: {} edges, rows {}..{} across {} chunks",
            table.len(),
            region.top,
            region.bottom,
            chunks.len()
        );
        let outcome = chunks.par_iter().try_for_each(|&(start, end)| {
            let mut ctx = SolidScannerContext::<A>::new(table, region.left, region.width, start);
            solid_rows(&mut ctx, table, start, end, cancel, sink)
        });
        return Ok(outcome.is_ok());
    }

    debug!(
        "solid fill: {} edges, rows {}..{} sequential",
        table.len(),
        region.top,
        region.bottom
    );
    let mut ctx = SolidScannerContext::<A>::new(table, region.left, region.width, region.top);
    Ok(solid_rows(&mut ctx, table, region.top, region.bottom, cancel, sink).is_ok())
}

fn solid_rows<A, S>(
    ctx: &mut SolidScannerContext<A>,
    table: &EdgeTable,
    start: i32,
    end: i32,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<(), Stop>
where
    A: ActiveEdges,
    S: SolidSink + ?Sized,
{
    for _ in start..end {
        if is_cancelled(cancel) {
            return Err(Stop::Cancelled);
        }
        ctx.move_next_row(table);
        if ctx.scan_current_row(table) {
            let (min_column, max_column) = ctx.dirty_columns();
            sink.solid_scanline(SolidScanline {
                row: ctx.current_row(),
                left: ctx.left(),
                mask: ctx.mask(),
                min_column,
                max_column,
            });
        }
    }
    Ok(())
}

fn run_aa<A, S>(
    table: &EdgeTable,
    region: &ScanRegion,
    options: &FillOptions,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<bool, FillError>
where
    A: ActiveEdges,
    S: CoverageSink + ?Sized,
{
    if should_parallelize(region, options.parallelism) {
        let chunks = row_chunks(region);
        debug!(
            "aa fill: {} edges, rows {}..{} across {} chunks",
            table.len(),
            region.top,
            region.bottom,
            chunks.len()
        );
        let outcome = chunks.par_iter().try_for_each(|&(start, end)| {
            let mut ctx = AaScannerContext::<A>::new(table, region.left, region.width, start);
            aa_rows(&mut ctx, table, start, end, cancel, sink)
        });
        return Ok(outcome.is_ok());
    }

    debug!(
        "aa fill: {} edges, rows {}..{} sequential",
        table.len(),
        region.top,
        region.bottom
    );
    let mut ctx = AaScannerContext::<A>::new(table, region.left, region.width, region.top);
    Ok(aa_rows(&mut ctx, table, region.top, region.bottom, cancel, sink).is_ok())
}

fn aa_rows<A, S>(
    ctx: &mut AaScannerContext<A>,
    table: &EdgeTable,
    start: i32,
    end: i32,
    cancel: Option<&CancelFlag>,
    sink: &S,
) -> Result<(), Stop>
where
    A: ActiveEdges,
    S: CoverageSink + ?Sized,
{
    for _ in start..end {
        if is_cancelled(cancel) {
            return Err(Stop::Cancelled);
        }
        ctx.move_next_row();
        while ctx.move_next_subpixel_row(table) {
            ctx.scan_current_subpixel_row(table);
        }
        if ctx.is_dirty() {
            let (min_column, max_column) = ctx.dirty_columns();
            sink.coverage_scanline(CoverageScanline {
                row: ctx.current_row(),
                left: ctx.left(),
                coverage: ctx.coverage().as_slice(),
                min_column,
                max_column,
            });
        }
    }
    Ok(())
}

/// Reference consumer assembling aliased rows into a full grid.
/// Thread-safe the blunt way; rows are disjoint so contention is rare.
#[derive(Debug)]
pub struct MaskGrid {
    top: i32,
    left: i32,
    width: usize,
    rows: Mutex<Vec<Vec<u8>>>,
}

impl MaskGrid {
    pub fn new(region: &ScanRegion) -> Self {
        MaskGrid {
            top: region.top,
            left: region.left,
            width: region.width,
            rows: Mutex::new(vec![Vec::new(); region.rows().max(0) as usize]),
        }
    }

    /// True when pixel (x, y) in surface coordinates is set.
    pub fn get(&self, x: i32, y: i32) -> bool {
        let rows = self.rows.lock().unwrap();
        let row = match usize::try_from(y - self.top).ok().and_then(|i| rows.get(i)) {
            Some(r) if !r.is_empty() => r,
            _ => return false,
        };
        let column = x - self.left;
        if column < 0 || column as usize >= self.width {
            return false;
        }
        let column = column as usize;
        row[column >> 3] & (1 << (column & 7)) != 0
    }

    /// Packed mask bytes of one row, empty when the row was clean.
    pub fn row_bytes(&self, y: i32) -> Vec<u8> {
        let rows = self.rows.lock().unwrap();
        usize::try_from(y - self.top)
            .ok()
            .and_then(|i| rows.get(i).cloned())
            .unwrap_or_default()
    }

    pub fn set_pixel_count(&self) -> usize {
        let rows = self.rows.lock().unwrap();
        rows.iter()
            .flat_map(|r| r.iter())
            .map(|b| b.count_ones() as usize)
            .sum()
    }
}

impl SolidSink for MaskGrid {
    fn solid_scanline(&self, scanline: SolidScanline<'_>) {
        let mut rows = self.rows.lock().unwrap();
        let index = (scanline.row - self.top) as usize;
        rows[index] = scanline.mask.as_bytes().to_vec();
    }
}

/// Reference consumer assembling anti-aliased rows into a full grid.
#[derive(Debug)]
pub struct CoverageGrid {
    top: i32,
    left: i32,
    width: usize,
    rows: Mutex<Vec<Vec<f32>>>,
}

impl CoverageGrid {
    pub fn new(region: &ScanRegion) -> Self {
        CoverageGrid {
            top: region.top,
            left: region.left,
            width: region.width,
            rows: Mutex::new(vec![Vec::new(); region.rows().max(0) as usize]),
        }
    }

    /// Coverage of pixel (x, y) in surface coordinates, 0.0 when never
    /// touched.
    pub fn get(&self, x: i32, y: i32) -> f32 {
        let rows = self.rows.lock().unwrap();
        let row = match usize::try_from(y - self.top).ok().and_then(|i| rows.get(i)) {
            Some(r) if !r.is_empty() => r,
            _ => return 0.0,
        };
        let column = x - self.left;
        if column < 0 || column as usize >= self.width {
            return 0.0;
        }
        row[column as usize]
    }

    pub fn row(&self, y: i32) -> Vec<f32> {
        let rows = self.rows.lock().unwrap();
        usize::try_from(y - self.top)
            .ok()
            .and_then(|i| rows.get(i).cloned())
            .unwrap_or_default()
    }

    /// Total accumulated coverage, an area estimate of the filled
    /// shape.
    pub fn sum(&self) -> f64 {
        let rows = self.rows.lock().unwrap();
        rows.iter()
            .flat_map(|r| r.iter())
            .map(|&c| f64::from(c))
            .sum()
    }
}

impl CoverageSink for CoverageGrid {
    fn coverage_scanline(&self, scanline: CoverageScanline<'_>) {
        let mut rows = self.rows.lock().unwrap();
        let index = (scanline.row - self.top) as usize;
        rows[index] = scanline.coverage.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Point;

    #[test]
    fn region_from_bounds_clips_to_destination() {
        let path = Bounds { min_x: -5.0, min_y: -5.0, max_x: 20.0, max_y: 20.0 };
        let dest = Bounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 8.0 };
        let region = ScanRegion::from_bounds(&path, &dest).unwrap().unwrap();
        assert_eq!(region, ScanRegion { top: 0, bottom: 9, left: 0, width: 10 });
    }

    #[test]
    fn region_from_disjoint_bounds_is_none() {
        let path = Bounds { min_x: 0.0, min_y: 0.0, max_x: 1.0, max_y: 1.0 };
        let dest = Bounds { min_x: 5.0, min_y: 5.0, max_x: 9.0, max_y: 9.0 };
        assert!(ScanRegion::from_bounds(&path, &dest).unwrap().is_none());
    }

    #[test]
    fn huge_coordinates_overflow_instead_of_clamping() {
        let path = Bounds { min_x: 0.0, min_y: 0.0, max_x: 1e20, max_y: 10.0 };
        let dest = Bounds { min_x: 0.0, min_y: 0.0, max_x: 2e20, max_y: 10.0 };
        assert!(matches!(
            ScanRegion::from_bounds(&path, &dest),
            Err(FillError::CoordinateOverflow(_))
        ));
    }

    struct NullSink;

    impl SolidSink for NullSink {
        fn solid_scanline(&self, _: SolidScanline<'_>) {}
    }

    #[test]
    fn nan_vertex_fails_the_whole_fill() {
        let pts: Vec<Point> = [(0.0, 0.0), (10.0, f32::NAN), (10.0, 10.0), (0.0, 10.0)]
            .iter()
            .map(|&(x, y): &(f32, f32)| Point::new(x, y))
            .collect();
        let path = crate::path::RawPath::from_polygon(&pts, true);
        let dest = Bounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 10.0 };
        let result = fill_path_solid(&path, &dest, &FillOptions::default(), None, &NullSink);
        assert!(matches!(result, Err(FillError::CoordinateOverflow(_))));
    }

    #[test]
    fn nan_bounds_fail_visibly() {
        let mut path = crate::path::RawPath::new();
        path.push(crate::path::RawFigure::open(vec![
            Point::new(0.0, f32::NAN),
            Point::new(1.0, 1.0),
        ]));
        let dest = Bounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 10.0 };
        assert!(ScanRegion::from_bounds(path.bounds(), &dest).is_err());
    }

    #[test]
    fn row_chunks_cover_the_region() {
        let region = ScanRegion { top: 3, bottom: 100, left: 0, width: 64 };
        let chunks = row_chunks(&region);
        assert_eq!(chunks.first().unwrap().0, 3);
        assert_eq!(chunks.last().unwrap().1, 100);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }
}
