//! Active edge tables: the working set of edges straddling the current
//! scan position, one implementation per fill rule.
//!
//! Both rules share the enter/leave/remove mechanics; they differ only
//! in how `scan_line` turns the active set into sorted span boundaries.
//! Alternate is pure even-odd parity; NonZero accumulates a winding
//! number with a deterministic tie-breaking offset.

use crate::edge::EdgeTable;
use crate::SORT_STABILIZER_DELTA;

/// Polygon fill rule selector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FillMode {
    /// Even-odd parity. The cheaper default.
    Alternate,
    /// Non-zero winding; fills self-intersecting and nested
    /// opposite-direction polygons where Alternate punches holes.
    NonZero,
}

impl Default for FillMode {
    fn default() -> FillMode {
        FillMode::Alternate
    }
}

pub(crate) const ENTERING: u8 = 0b01;
pub(crate) const LEAVING: u8 = 0b10;

#[derive(Debug, Copy, Clone)]
struct ActiveEdge {
    edge: u32,
    flags: u8,
}

/// The fill-rule seam: one implementation per [`FillMode`].
///
/// A table is owned by exactly one scanner context; parallel workers
/// get deep clones, never shared references.
pub trait ActiveEdges: Clone + Send {
    fn with_capacity(capacity: usize) -> Self;

    /// An edge's top row has been reached.
    fn enter(&mut self, edge: u32);

    /// An edge's bottom row has been reached; flags it for removal.
    fn leave(&mut self, edge: u32);

    /// Compact out edges that have left and demote fresh entries to
    /// interior status. Called once per scanned (sub)row.
    fn remove_leaving(&mut self);

    /// Append the sorted inside/outside transition xs for scan
    /// position `y` to `out`. Consecutive pairs are the inside spans.
    fn scan_line(&mut self, y: f64, table: &EdgeTable, out: &mut Vec<f64>);

    /// Occupied slots, for diagnostics and tests.
    fn count(&self) -> usize;
}

/// Shared enter/leave/remove mechanics. Active sets are small (bounded
/// by local polygon complexity), so linear scans beat anything clever.
#[derive(Debug, Clone)]
struct EdgeList {
    entries: Vec<ActiveEdge>,
}

impl EdgeList {
    fn with_capacity(capacity: usize) -> Self {
        EdgeList { entries: Vec::with_capacity(capacity) }
    }

    fn enter(&mut self, edge: u32) {
        self.entries.push(ActiveEdge { edge, flags: ENTERING });
    }

    fn leave(&mut self, edge: u32) {
        for entry in &mut self.entries {
            if entry.edge == edge {
                entry.flags |= LEAVING;
                return;
            }
        }
        debug_assert!(false, "leave() for edge {} that never entered", edge);
    }

    fn remove_leaving(&mut self) {
        self.entries.retain(|e| e.flags & LEAVING == 0);
        for entry in &mut self.entries {
            entry.flags = 0;
        }
    }
}

/// Per-entry emission decision shared by both rules.
///
/// Leaving takes priority over entering: an edge contained entirely
/// between two scan steps carries both flags and only counts as a
/// corner touch when both of its endpoints emit; otherwise its crossing
/// belongs to a neighbouring edge.
#[inline]
fn emission(flags: u8, emit_start: bool, emit_end: bool) -> (bool, bool) {
    if flags & LEAVING != 0 {
        if flags & ENTERING != 0 {
            (emit_start && emit_end, true)
        } else {
            (emit_end, false)
        }
    } else if flags & ENTERING != 0 {
        (emit_start, false)
    } else {
        (true, false)
    }
}

/// Even-odd (Alternate) active edge table.
#[derive(Debug, Clone)]
pub struct AlternateActiveEdges {
    list: EdgeList,
}

impl ActiveEdges for AlternateActiveEdges {
    fn with_capacity(capacity: usize) -> Self {
        AlternateActiveEdges { list: EdgeList::with_capacity(capacity) }
    }

    fn enter(&mut self, edge: u32) {
        self.list.enter(edge);
    }

    fn leave(&mut self, edge: u32) {
        self.list.leave(edge);
    }

    fn remove_leaving(&mut self) {
        self.list.remove_leaving();
    }

    fn scan_line(&mut self, y: f64, table: &EdgeTable, out: &mut Vec<f64>) {
        let edges = table.edges();
        for entry in &self.list.entries {
            let e = &edges[entry.edge as usize];
            let (emit, corner) = emission(entry.flags, e.emit_start, e.emit_end);
            if emit {
                let x = e.x_at(y);
                out.push(x);
                if corner {
                    // A point touch is an enter and a leave in one.
                    out.push(x);
                }
            }
        }
        out.sort_by(|a, b| a.total_cmp(b));
    }

    fn count(&self) -> usize {
        self.list.entries.len()
    }
}

/// Intersection direction for the winding sweep.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum IntersectionKind {
    Ascending,
    Descending,
    Corner,
}

impl IntersectionKind {
    /// Sort-key offset so edges meeting at exactly the same x are
    /// ordered by direction instead of colliding nondeterministically.
    fn stabilizer(self) -> f64 {
        match self {
            IntersectionKind::Ascending => -SORT_STABILIZER_DELTA,
            IntersectionKind::Descending => SORT_STABILIZER_DELTA,
            IntersectionKind::Corner => 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Intersection {
    x: f64,
    kind: IntersectionKind,
}

/// Non-zero-winding active edge table.
#[derive(Debug, Clone)]
pub struct NonZeroActiveEdges {
    list: EdgeList,
    intersections: Vec<Intersection>,
}

impl ActiveEdges for NonZeroActiveEdges {
    fn with_capacity(capacity: usize) -> Self {
        NonZeroActiveEdges {
            list: EdgeList::with_capacity(capacity),
            intersections: Vec::with_capacity(capacity),
        }
    }

    fn enter(&mut self, edge: u32) {
        self.list.enter(edge);
    }

    fn leave(&mut self, edge: u32) {
        self.list.leave(edge);
    }

    fn remove_leaving(&mut self) {
        self.list.remove_leaving();
    }

    fn scan_line(&mut self, y: f64, table: &EdgeTable, out: &mut Vec<f64>) {
        let edges = table.edges();
        self.intersections.clear();
        for entry in &self.list.entries {
            let e = &edges[entry.edge as usize];
            let (emit, corner) = emission(entry.flags, e.emit_start, e.emit_end);
            if !emit {
                continue;
            }
            let kind = if corner {
                IntersectionKind::Corner
            } else if e.ascending {
                IntersectionKind::Ascending
            } else {
                IntersectionKind::Descending
            };
            self.intersections.push(Intersection { x: e.x_at(y), kind });
        }
        self.intersections
            .sort_by(|a, b| (a.x + a.kind.stabilizer()).total_cmp(&(b.x + b.kind.stabilizer())));

        // Sweep left to right; a boundary is kept exactly when the
        // winding number enters or leaves non-zero territory.
        let mut winding: i32 = 0;
        for isect in &self.intersections {
            let diffs: &[i32] = match isect.kind {
                IntersectionKind::Ascending => &[1],
                IntersectionKind::Descending => &[-1],
                // A corner passes through without changing the net
                // winding but must still surface as two events.
                IntersectionKind::Corner => &[-1, 1],
            };
            for &diff in diffs {
                if (winding == 0 && diff != 0) || winding * diff == -1 {
                    out.push(isect.x);
                }
                winding += diff;
            }
        }
        debug_assert_eq!(winding, 0, "winding did not close at y={}", y);
    }

    fn count(&self) -> usize {
        self.list.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeTable;
    use crate::path::{Point, RawPath};

    fn polygon(v: &[(f32, f32)]) -> RawPath {
        let pts: Vec<Point> = v.iter().map(|&(x, y)| Point::new(x, y)).collect();
        RawPath::from_polygon(&pts, true)
    }

    fn enter_all<A: ActiveEdges>(active: &mut A, table: &EdgeTable) {
        for i in 0..table.len() as u32 {
            active.enter(i);
        }
    }

    #[test]
    fn alternate_interior_row_pairs_up() {
        let path = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let table = EdgeTable::build(&path, 0.25);
        let mut active = AlternateActiveEdges::with_capacity(4);
        enter_all(&mut active, &table);
        active.remove_leaving();

        let mut out = Vec::new();
        active.scan_line(5.0, &table, &mut out);
        assert_eq!(out, vec![0.0, 10.0]);
    }

    #[test]
    fn nonzero_same_direction_overlap_stays_filled() {
        // Two nested rectangles wound the same way: the overlap has
        // winding 2 and must not open a hole.
        let mut path = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let inner: Vec<Point> = [(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)]
            .iter()
            .map(|&(x, y): &(f32, f32)| Point::new(x, y))
            .collect();
        path.push(crate::path::RawFigure::closed(inner));
        let table = EdgeTable::build(&path, 0.25);

        let mut alt = AlternateActiveEdges::with_capacity(8);
        let mut nz = NonZeroActiveEdges::with_capacity(8);
        enter_all(&mut alt, &table);
        enter_all(&mut nz, &table);
        alt.remove_leaving();
        nz.remove_leaving();

        let mut alt_out = Vec::new();
        let mut nz_out = Vec::new();
        alt.scan_line(5.0, &table, &mut alt_out);
        nz.scan_line(5.0, &table, &mut nz_out);

        // Alternate punches the inner rectangle out; NonZero does not.
        assert_eq!(alt_out, vec![0.0, 2.0, 8.0, 10.0]);
        assert_eq!(nz_out, vec![0.0, 10.0]);
    }

    #[test]
    fn remove_leaving_compacts_and_demotes() {
        let path = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let table = EdgeTable::build(&path, 0.25);
        let mut active = AlternateActiveEdges::with_capacity(4);
        active.enter(0);
        active.enter(1);
        active.leave(1);
        active.remove_leaving();
        assert_eq!(active.count(), 1);

        // The survivor is interior now: it emits unconditionally.
        let mut out = Vec::new();
        active.scan_line(5.0, &table, &mut out);
        assert_eq!(out.len(), 1);
    }
}
