//! Region scanner contexts.
//!
//! A context is a cursor over the shared, read-only [`EdgeTable`]: it
//! advances the active-edge table row by row (Solid) or sub-row by
//! sub-row (AntiAliasing) and accumulates coverage into its own
//! reusable buffer. Contexts deep-clone for parallel workers via
//! [`SolidScannerContext::clone_and_resync`]; a context is only ever
//! touched by one thread.

use log::trace;

use crate::active::ActiveEdges;
use crate::buffer::{CoverageBuffer, ScanlineMask};
use crate::edge::EdgeTable;
use crate::{SUBPIXEL_COUNT, SUBPIXEL_SIZE};

/// Cursor state over the two Y-sort permutations plus the owned active
/// edge table. Shared by both precisions.
#[derive(Debug, Clone)]
struct ScanCursor<A: ActiveEdges> {
    start_cursor: usize,
    end_cursor: usize,
    active: A,
}

impl<A: ActiveEdges> ScanCursor<A> {
    fn new(table: &EdgeTable) -> Self {
        ScanCursor {
            start_cursor: 0,
            end_cursor: 0,
            active: A::with_capacity(table.max_figure_vertices().max(8)),
        }
    }

    /// Enter and leave every edge whose snapped endpoint Y has been
    /// reached by scan position `y`. Enters run first so an edge
    /// contained in a single step is present when its leave arrives.
    fn visit(&mut self, table: &EdgeTable, y: f64) {
        let edges = table.edges();
        let starts = table.sorted_by_start();
        while self.start_cursor < starts.len() {
            let idx = starts[self.start_cursor];
            if f64::from(edges[idx as usize].y_start) > y {
                break;
            }
            self.active.enter(idx);
            self.start_cursor += 1;
        }
        let ends = table.sorted_by_end();
        while self.end_cursor < ends.len() {
            let idx = ends[self.end_cursor];
            if f64::from(edges[idx as usize].y_end) > y {
                break;
            }
            self.active.leave(idx);
            self.end_cursor += 1;
        }
    }

    /// Replay enter/leave/remove for every edge whose extent lies at or
    /// before `y_prev` without emitting spans, leaving the cursor in
    /// exactly the state a sequential scan would have after processing
    /// the row that sampled `y_prev`.
    fn skip_above(&mut self, table: &EdgeTable, y_prev: f64) {
        let edges = table.edges();
        let starts = table.sorted_by_start();
        while self.start_cursor < starts.len() {
            let idx = starts[self.start_cursor];
            let e = &edges[idx as usize];
            if f64::from(e.y_start) > y_prev {
                break;
            }
            // Edges that ended above y_prev were entered and removed
            // again; they never need to materialize.
            if f64::from(e.y_end) > y_prev {
                self.active.enter(idx);
            }
            self.start_cursor += 1;
        }
        let ends = table.sorted_by_end();
        while self.end_cursor < ends.len() {
            let idx = ends[self.end_cursor];
            if f64::from(edges[idx as usize].y_end) > y_prev {
                break;
            }
            self.end_cursor += 1;
        }
        // Demote the replayed entries to interior status.
        self.active.remove_leaving();
    }
}

/// Aliased (1-bit) scanner context. Advances one integer row at a time
/// and packs coverage into a [`ScanlineMask`].
#[derive(Debug, Clone)]
pub struct SolidScannerContext<A: ActiveEdges> {
    row: i32,
    cursor: ScanCursor<A>,
    mask: ScanlineMask,
    dirty: bool,
    min_column: i32,
    max_column: i32,
    boundaries: Vec<f64>,
    left: i32,
    width: usize,
}

impl<A: ActiveEdges> SolidScannerContext<A> {
    /// A context positioned just before `first_row`, with every edge
    /// that starts and ends above it already replayed.
    pub fn new(table: &EdgeTable, left: i32, width: usize, first_row: i32) -> Self {
        let mut cursor = ScanCursor::new(table);
        cursor.skip_above(table, f64::from(first_row) - 1.0);
        SolidScannerContext {
            row: first_row - 1,
            cursor,
            mask: ScanlineMask::new(width),
            dirty: false,
            min_column: i32::MAX,
            max_column: i32::MIN,
            boundaries: Vec::with_capacity(table.max_figure_vertices().max(8)),
            left,
            width,
        }
    }

    /// Deep, independent copy fast-forwarded to just before
    /// `target_row`; seeds a parallel worker. The clone owns a fresh
    /// active table and scanline buffer and shares only the immutable
    /// edge table with its source.
    pub fn clone_and_resync(&self, table: &EdgeTable, target_row: i32) -> Self {
        Self::new(table, self.left, self.width, target_row)
    }

    pub fn current_row(&self) -> i32 {
        self.row
    }

    /// Advance to the next row: recycle the scanline buffer and visit
    /// every edge whose start/end Y has just been reached.
    pub fn move_next_row(&mut self, table: &EdgeTable) {
        self.row += 1;
        if self.dirty {
            self.mask.clear();
            self.dirty = false;
        }
        self.min_column = i32::MAX;
        self.max_column = i32::MIN;
        self.cursor.visit(table, f64::from(self.row));
    }

    /// Scan the current row into the mask. Returns true when any pixel
    /// was touched.
    pub fn scan_current_row(&mut self, table: &EdgeTable) -> bool {
        let y = f64::from(self.row);
        self.boundaries.clear();
        self.cursor.active.scan_line(y, table, &mut self.boundaries);
        trace!(
            "solid row {}: {} active, {} boundaries",
            self.row,
            self.cursor.active.count(),
            self.boundaries.len()
        );
        let pairs = self.boundaries.len() / 2;
        for i in 0..pairs {
            self.fill_span(self.boundaries[2 * i], self.boundaries[2 * i + 1]);
        }
        self.cursor.active.remove_leaving();
        self.dirty
    }

    /// Set the bits of one inside span. Interior pixels are always
    /// set; a boundary pixel is set only when at least half of it is
    /// covered (pixel-center rounding, kept exactly as-is: changing the
    /// threshold changes golden-image output).
    fn fill_span(&mut self, x0: f64, x1: f64) {
        let left = f64::from(self.left);
        let right = left + self.width as f64;
        let x0 = x0.max(left);
        let x1 = x1.min(right);
        if x1 <= x0 {
            return;
        }
        let first = (x0 - 0.5).ceil() as i64;
        let last = (x1 - 0.5).floor() as i64;
        if last < first {
            return;
        }
        let c0 = (first - self.left as i64) as i32;
        let c1 = (last - self.left as i64) as i32;
        self.mask.set_range(c0 as usize, c1 as usize);
        self.dirty = true;
        self.min_column = self.min_column.min(c0);
        self.max_column = self.max_column.max(c1);
    }

    pub fn mask(&self) -> &ScanlineMask {
        &self.mask
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    /// Inclusive dirty column range, buffer-relative. Meaningless when
    /// the row is clean.
    pub fn dirty_columns(&self) -> (i32, i32) {
        (self.min_column, self.max_column)
    }
}

/// Anti-aliased scanner context. Sweeps 16 subpixel rows per pixel row
/// and accumulates fractional coverage into a [`CoverageBuffer`].
#[derive(Debug, Clone)]
pub struct AaScannerContext<A: ActiveEdges> {
    row: i32,
    subrow: i32,
    cursor: ScanCursor<A>,
    coverage: CoverageBuffer,
    dirty: bool,
    min_column: i32,
    max_column: i32,
    boundaries: Vec<f64>,
    left: i32,
    width: usize,
}

impl<A: ActiveEdges> AaScannerContext<A> {
    pub fn new(table: &EdgeTable, left: i32, width: usize, first_row: i32) -> Self {
        let mut cursor = ScanCursor::new(table);
        // State after the last sub-row of the previous pixel row.
        let y_prev =
            f64::from(first_row) - 1.0 + f64::from(SUBPIXEL_COUNT - 1) / f64::from(SUBPIXEL_COUNT);
        cursor.skip_above(table, y_prev);
        AaScannerContext {
            row: first_row - 1,
            subrow: -1,
            cursor,
            coverage: CoverageBuffer::new(width),
            dirty: false,
            min_column: i32::MAX,
            max_column: i32::MIN,
            boundaries: Vec::with_capacity(table.max_figure_vertices().max(8)),
            left,
            width,
        }
    }

    /// See [`SolidScannerContext::clone_and_resync`].
    pub fn clone_and_resync(&self, table: &EdgeTable, target_row: i32) -> Self {
        Self::new(table, self.left, self.width, target_row)
    }

    pub fn current_row(&self) -> i32 {
        self.row
    }

    pub fn move_next_row(&mut self) {
        self.row += 1;
        self.subrow = -1;
        if self.dirty {
            self.coverage.clear();
            self.dirty = false;
        }
        self.min_column = i32::MAX;
        self.max_column = i32::MIN;
    }

    /// Step to the next of the 16 subpixel rows. Returns false once the
    /// current pixel row is exhausted.
    pub fn move_next_subpixel_row(&mut self, table: &EdgeTable) -> bool {
        if self.subrow + 1 >= SUBPIXEL_COUNT as i32 {
            return false;
        }
        self.subrow += 1;
        self.cursor.visit(table, self.sample_y());
        true
    }

    /// Scan the current subpixel row, accumulating coverage.
    pub fn scan_current_subpixel_row(&mut self, table: &EdgeTable) {
        let y = self.sample_y();
        self.boundaries.clear();
        self.cursor.active.scan_line(y, table, &mut self.boundaries);
        let pairs = self.boundaries.len() / 2;
        for i in 0..pairs {
            self.accumulate_span(self.boundaries[2 * i], self.boundaries[2 * i + 1]);
        }
        self.cursor.active.remove_leaving();
    }

    fn sample_y(&self) -> f64 {
        f64::from(self.row) + f64::from(self.subrow) / f64::from(SUBPIXEL_COUNT)
    }

    /// Add one sub-row's contribution: a flat 1/16 for fully covered
    /// pixels, width-fraction * 1/16 at the two boundary pixels.
    fn accumulate_span(&mut self, x0: f64, x1: f64) {
        let left = f64::from(self.left);
        let right = left + self.width as f64;
        let x0 = x0.max(left);
        let x1 = x1.min(right);
        if x1 <= x0 {
            return;
        }
        let i0 = x0.floor() as i64;
        let mut i1 = x1.floor() as i64;
        let mut right_frac = x1 - i1 as f64;
        if right_frac == 0.0 {
            // Span ends exactly on a pixel boundary; the last covered
            // pixel is the one before it.
            i1 -= 1;
            right_frac = 1.0;
        }
        let c0 = (i0 - self.left as i64) as usize;
        let c1 = (i1 - self.left as i64) as usize;
        if c0 == c1 {
            self.coverage.add(c0, ((x1 - x0) as f32) * SUBPIXEL_SIZE);
        } else {
            self.coverage
                .add(c0, (((i0 + 1) as f64 - x0) as f32) * SUBPIXEL_SIZE);
            self.coverage.add(c1, (right_frac as f32) * SUBPIXEL_SIZE);
            if c1 - c0 > 1 {
                self.coverage.add_range(c0 + 1, c1 - 1, SUBPIXEL_SIZE);
            }
        }
        self.dirty = true;
        self.min_column = self.min_column.min(c0 as i32);
        self.max_column = self.max_column.max(c1 as i32);
    }

    /// True when the finished row touched any pixel.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn coverage(&self) -> &CoverageBuffer {
        &self.coverage
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn dirty_columns(&self) -> (i32, i32) {
        (self.min_column, self.max_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active::AlternateActiveEdges;
    use crate::edge::EdgeTable;
    use crate::path::{Point, RawPath};
    use crate::{AA_ROUNDING_UNIT, SOLID_ROUNDING_UNIT};

    fn diamond() -> RawPath {
        let pts: Vec<Point> = [(5.0, 0.0), (10.0, 5.0), (5.0, 10.0), (0.0, 5.0)]
            .iter()
            .map(|&(x, y): &(f32, f32)| Point::new(x, y))
            .collect();
        RawPath::from_polygon(&pts, true)
    }

    #[test]
    fn solid_rows_match_geometry() {
        let table = EdgeTable::build(&diamond(), SOLID_ROUNDING_UNIT);
        let mut ctx = SolidScannerContext::<AlternateActiveEdges>::new(&table, 0, 10, 0);
        let mut rows = Vec::new();
        for _ in 0..11 {
            ctx.move_next_row(&table);
            let dirty = ctx.scan_current_row(&table);
            rows.push(if dirty { ctx.dirty_columns() } else { (0, -1) });
        }
        // Row 5 crosses the widest point: x in [0,10) -> columns 0..=9.
        assert_eq!(rows[5], (0, 9));
        // The apex row collapses to an empty span.
        assert_eq!(rows[0], (0, -1));
        // Row 2: x in [3,7) -> columns 3..=6.
        assert_eq!(rows[2], (3, 6));
    }

    #[test]
    fn resynced_context_matches_sequential() {
        let table = EdgeTable::build(&diamond(), SOLID_ROUNDING_UNIT);
        let mut seq = SolidScannerContext::<AlternateActiveEdges>::new(&table, 0, 10, 0);
        for _ in 0..=6 {
            seq.move_next_row(&table);
            seq.scan_current_row(&table);
        }

        let mut skipped = seq.clone_and_resync(&table, 7);
        assert_eq!(skipped.current_row(), 6);
        seq.move_next_row(&table);
        seq.scan_current_row(&table);
        skipped.move_next_row(&table);
        skipped.scan_current_row(&table);
        assert_eq!(seq.current_row(), skipped.current_row());
        assert_eq!(seq.dirty_columns(), skipped.dirty_columns());
        assert_eq!(seq.mask().as_bytes(), skipped.mask().as_bytes());
    }

    #[test]
    fn aa_full_row_accumulates_to_one() {
        let pts: Vec<Point> = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
            .iter()
            .map(|&(x, y): &(f32, f32)| Point::new(x, y))
            .collect();
        let table = EdgeTable::build(&RawPath::from_polygon(&pts, true), AA_ROUNDING_UNIT);
        let mut ctx = AaScannerContext::<AlternateActiveEdges>::new(&table, 0, 10, 0);
        ctx.move_next_row();
        while ctx.move_next_subpixel_row(&table) {
            ctx.scan_current_subpixel_row(&table);
        }
        assert!(ctx.is_dirty());
        for &c in ctx.coverage().as_slice() {
            assert!((c - 1.0).abs() < 1e-6, "coverage {}", c);
        }
    }
}
