//! Edge table construction.
//!
//! Walks every figure's vertex ring, classifies the raw segments,
//! resolves which shared-vertex endpoints emit scanline intersection
//! events, and packs the result into an immutable array of [`EdgeEntry`]
//! records plus two sort permutations. Built once per (path, rounding
//! unit) pair and shared read-only by every scanner context.

use log::debug;

use crate::path::RawPath;

/// Snap a Y coordinate to the scanner's rounding unit so start- and
/// end-event ordering agree on which row an endpoint belongs to.
#[inline]
pub fn snap(y: f32, unit: f32) -> f32 {
    (y / unit).round() * unit
}

/// Raw segment direction in original vertex order. Y grows downward,
/// so Ascending means Y decreases along the segment.
#[derive(Debug, Copy, Clone, PartialEq)]
enum SegmentKind {
    Ascending,
    Descending,
    HorizontalLeft,
    HorizontalRight,
}

impl SegmentKind {
    fn is_horizontal(self) -> bool {
        matches!(self, SegmentKind::HorizontalLeft | SegmentKind::HorizontalRight)
    }
}

/// One direction-aware polygon edge, stored top-to-bottom.
///
/// `emit_start`/`emit_end` say whether a scanline passing exactly
/// through that endpoint's Y receives an intersection event from this
/// edge; they encode the shared-vertex rules that keep local extrema
/// from being double-counted or lost.
#[derive(Debug, Copy, Clone)]
pub struct EdgeEntry {
    pub y_start: f32,
    pub y_end: f32,
    /// Reciprocal slope: `x(y) = p*y + q`.
    pub p: f64,
    pub q: f64,
    /// True when the original segment ran bottom-to-top and was stored
    /// reversed to keep `y_start < y_end`.
    pub ascending: bool,
    pub emit_start: bool,
    pub emit_end: bool,
}

impl EdgeEntry {
    /// X coordinate of this edge at scan position `y`.
    #[inline]
    pub fn x_at(&self, y: f64) -> f64 {
        self.p * y + self.q
    }
}

/// Working record while configuring one figure's segments.
#[derive(Debug, Copy, Clone)]
struct Segment {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    kind: SegmentKind,
    emit_p0: bool,
    emit_p1: bool,
}

/// The immutable edge set for one fill operation.
#[derive(Debug, Clone)]
pub struct EdgeTable {
    edges: Vec<EdgeEntry>,
    sorted_by_start: Vec<u32>,
    sorted_by_end: Vec<u32>,
    max_figure_vertices: usize,
    rounding_unit: f32,
}

impl EdgeTable {
    /// Build the edge table for `path`, snapping vertex Ys to `unit`.
    pub fn build(path: &RawPath, unit: f32) -> EdgeTable {
        let mut edges = Vec::new();
        let mut max_figure_vertices = 0;

        for figure in path.figures() {
            // Fewer than four stored vertices cannot bound area.
            if figure.vertex_count() <= 3 {
                continue;
            }
            max_figure_vertices = max_figure_vertices.max(figure.vertex_count());
            build_figure(figure.ring(), unit, &mut edges);
        }

        let mut sorted_by_start: Vec<u32> = (0..edges.len() as u32).collect();
        let mut sorted_by_end = sorted_by_start.clone();
        sorted_by_start.sort_by(|&a, &b| {
            edges[a as usize].y_start.total_cmp(&edges[b as usize].y_start)
        });
        sorted_by_end.sort_by(|&a, &b| {
            edges[a as usize].y_end.total_cmp(&edges[b as usize].y_end)
        });

        debug!(
            "edge table: {} edges from {} figures (unit {})",
            edges.len(),
            path.figures().len(),
            unit
        );

        EdgeTable {
            edges,
            sorted_by_start,
            sorted_by_end,
            max_figure_vertices,
            rounding_unit: unit,
        }
    }

    pub fn edges(&self) -> &[EdgeEntry] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge indices ordered by ascending `y_start`.
    pub fn sorted_by_start(&self) -> &[u32] {
        &self.sorted_by_start
    }

    /// Edge indices ordered by ascending `y_end`.
    pub fn sorted_by_end(&self) -> &[u32] {
        &self.sorted_by_end
    }

    /// Upper bound on simultaneously active edges of a single figure;
    /// used to pre-size per-row scratch buffers.
    pub fn max_figure_vertices(&self) -> usize {
        self.max_figure_vertices
    }

    pub fn rounding_unit(&self) -> f32 {
        self.rounding_unit
    }
}

fn classify(x0: f32, y0: f32, x1: f32, y1: f32) -> SegmentKind {
    if y1 < y0 {
        SegmentKind::Ascending
    } else if y1 > y0 {
        SegmentKind::Descending
    } else if x1 < x0 {
        SegmentKind::HorizontalLeft
    } else {
        // Coincident snapped points degrade to a horizontal segment;
        // they produce no edge and suppress nothing extra.
        SegmentKind::HorizontalRight
    }
}

fn build_figure(ring: &[crate::path::Point], unit: f32, edges: &mut Vec<EdgeEntry>) {
    let m = ring.len();
    if m < 3 {
        return;
    }

    let mut segments: Vec<Segment> = Vec::with_capacity(m);
    for i in 0..m {
        let a = ring[i];
        let b = ring[(i + 1) % m];
        let y0 = snap(a.y, unit);
        let y1 = snap(b.y, unit);
        segments.push(Segment {
            x0: a.x,
            y0,
            x1: b.x,
            y1,
            kind: classify(a.x, y0, b.x, y1),
            emit_p0: false,
            emit_p1: false,
        });
    }

    configure_emits(&mut segments);

    for seg in &segments {
        if seg.kind.is_horizontal() {
            continue;
        }
        edges.push(to_entry(seg));
    }
}

/// Apply the shared-vertex emit table to every adjacent segment pair.
///
/// The rules reduce to: an edge emits at its top endpoint whenever the
/// figure passes through or turns at that vertex, and at its bottom
/// endpoint only at a true local maximum (Descending meeting
/// Ascending). Flat bottoms and pass-through bottoms stay silent; the
/// continuation edge carries the crossing instead. Horizontal segments
/// never emit but still shape their neighbours' flags.
fn configure_emits(segments: &mut [Segment]) {
    use SegmentKind::*;
    let m = segments.len();
    for i in 0..m {
        let j = (i + 1) % m;
        match (segments[i].kind, segments[j].kind) {
            // Pass-through going down: the vertex is the second
            // segment's top.
            (Descending, Descending) => segments[j].emit_p0 = true,
            // Pass-through going up: the vertex is the first segment's
            // top (its raw end).
            (Ascending, Ascending) => segments[i].emit_p1 = true,
            // Local minimum-Y vertex (top apex): both edges own the
            // vertex as their top, both emit, and the pair collapses to
            // a degenerate span instead of an unpaired crossing.
            (Ascending, Descending) => {
                segments[i].emit_p1 = true;
                segments[j].emit_p0 = true;
            }
            // Local maximum-Y vertex (bottom apex): the only place a
            // bottom endpoint emits.
            (Descending, Ascending) => {
                segments[i].emit_p1 = true;
                segments[j].emit_p0 = true;
            }
            (HorizontalLeft, Descending) | (HorizontalRight, Descending) => {
                segments[j].emit_p0 = true
            }
            (Ascending, HorizontalLeft) | (Ascending, HorizontalRight) => {
                segments[i].emit_p1 = true
            }
            // Descending into a horizontal, horizontal into ascending,
            // horizontal runs: the non-contributing endpoint is
            // suppressed.
            _ => {}
        }
    }
}

fn to_entry(seg: &Segment) -> EdgeEntry {
    // Re-center on the midpoint before dividing so q stays accurate at
    // large coordinates.
    let dy = f64::from(seg.y1) - f64::from(seg.y0);
    let p = (f64::from(seg.x1) - f64::from(seg.x0)) / dy;
    let cx = (f64::from(seg.x0) + f64::from(seg.x1)) * 0.5;
    let cy = (f64::from(seg.y0) + f64::from(seg.y1)) * 0.5;
    let q = cx - p * cy;

    if seg.kind == SegmentKind::Ascending {
        EdgeEntry {
            y_start: seg.y1,
            y_end: seg.y0,
            p,
            q,
            ascending: true,
            emit_start: seg.emit_p1,
            emit_end: seg.emit_p0,
        }
    } else {
        EdgeEntry {
            y_start: seg.y0,
            y_end: seg.y1,
            p,
            q,
            ascending: false,
            emit_start: seg.emit_p0,
            emit_end: seg.emit_p1,
        }
    }
}
