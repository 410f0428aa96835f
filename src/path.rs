//! Flattened path geometry: the input model of the fill engine.
//!
//! A [`RawPath`] is an ordered set of [`RawFigure`]s, each an ordered
//! vertex ring (or open chain) produced by flattening lines, arcs and
//! Bezier curves elsewhere. Everything here is immutable once built.

/// A point in destination-surface coordinates.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

/// Axis-aligned bounding rectangle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Empty bounds; extending with any point makes them valid.
    pub fn empty() -> Self {
        Bounds {
            min_x: f32::MAX,
            min_y: f32::MAX,
            max_x: f32::MIN,
            max_y: f32::MIN,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Grow to include `p`. A NaN coordinate poisons the bounds for
    /// good; `f32::min`/`max` prefer the non-NaN operand and would
    /// swallow it.
    pub fn extend(&mut self, p: Point) {
        if p.x.is_nan() || p.y.is_nan() || self.poisoned() {
            self.poison();
            return;
        }
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&mut self, other: &Bounds) {
        if self.poisoned() || other.poisoned() {
            self.poison();
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    fn poisoned(&self) -> bool {
        self.min_x.is_nan()
            || self.min_y.is_nan()
            || self.max_x.is_nan()
            || self.max_y.is_nan()
    }

    fn poison(&mut self) {
        self.min_x = f32::NAN;
        self.min_y = f32::NAN;
        self.max_x = f32::NAN;
        self.max_y = f32::NAN;
    }

    /// A NaN vertex anywhere in the chain left the bounds poisoned, so
    /// one finite check at the region conversion catches malformed
    /// input.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    fn from_points(points: &[Point]) -> Self {
        let mut b = Bounds::empty();
        for &p in points {
            b.extend(p);
        }
        b
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::empty()
    }
}

/// One connected polygon outline within a path.
///
/// Closed figures store a trailing copy of their first vertex, the
/// flattener's convention; `vertex_count()` reports the stored count.
/// Figures with three or fewer stored vertices bound no area and
/// contribute no edges downstream.
#[derive(Debug, Clone)]
pub struct RawFigure {
    vertices: Vec<Point>,
    is_closed: bool,
    bounds: Bounds,
}

impl RawFigure {
    /// A closed ring. Appends the closing copy of the first vertex if
    /// the flattener did not already.
    pub fn closed(mut vertices: Vec<Point>) -> Self {
        if let (Some(&first), Some(&last)) = (vertices.first(), vertices.last()) {
            if vertices.len() > 1 && first != last {
                vertices.push(first);
            }
        }
        let bounds = Bounds::from_points(&vertices);
        RawFigure { vertices, is_closed: true, bounds }
    }

    /// An open chain. Filling treats it as if it were closed.
    pub fn open(vertices: Vec<Point>) -> Self {
        let bounds = Bounds::from_points(&vertices);
        RawFigure { vertices, is_closed: false, bounds }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The vertex ring walked by the edge-table builder: the stored
    /// vertices without the closing duplicate. Open figures are closed
    /// implicitly by wrapping.
    pub(crate) fn ring(&self) -> &[Point] {
        let n = self.vertices.len();
        if self.is_closed && n > 1 {
            &self.vertices[..n - 1]
        } else {
            &self.vertices
        }
    }
}

/// An ordered set of figures plus their combined bounds.
#[derive(Debug, Clone, Default)]
pub struct RawPath {
    figures: Vec<RawFigure>,
    bounds: Bounds,
}

impl RawPath {
    pub fn new() -> Self {
        RawPath { figures: vec![], bounds: Bounds::empty() }
    }

    pub fn push(&mut self, figure: RawFigure) {
        self.bounds.union(figure.bounds());
        self.figures.push(figure);
    }

    /// Convenience for a single-figure path.
    pub fn from_polygon(points: &[Point], closed: bool) -> Self {
        let mut path = RawPath::new();
        let figure = if closed {
            RawFigure::closed(points.to_vec())
        } else {
            RawFigure::open(points.to_vec())
        };
        path.push(figure);
        path
    }

    pub fn figures(&self) -> &[RawFigure] {
        &self.figures
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(v: &[(f32, f32)]) -> Vec<Point> {
        v.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn closed_figure_duplicates_start() {
        let f = RawFigure::closed(pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]));
        assert_eq!(f.vertex_count(), 4);
        assert_eq!(f.vertices()[3], Point::new(0.0, 0.0));
        assert_eq!(f.ring().len(), 3);
    }

    #[test]
    fn closed_figure_keeps_existing_duplicate() {
        let f = RawFigure::closed(pts(&[(0.0, 0.0), (4.0, 0.0), (0.0, 0.0)]));
        assert_eq!(f.vertex_count(), 3);
    }

    #[test]
    fn path_bounds_union() {
        let mut p = RawPath::new();
        p.push(RawFigure::closed(pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)])));
        p.push(RawFigure::open(pts(&[(-1.0, 5.0), (3.0, 6.0)])));
        let b = p.bounds();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (-1.0, 0.0, 3.0, 6.0));
    }

    #[test]
    fn nan_poisons_bounds() {
        let f = RawFigure::open(pts(&[(0.0, f32::NAN), (1.0, 1.0)]));
        assert!(!f.bounds().is_finite());
    }

    #[test]
    fn nan_poison_survives_later_points() {
        let mut b = Bounds::empty();
        b.extend(Point::new(0.0, f32::NAN));
        b.extend(Point::new(1.0, 1.0));
        assert!(!b.is_finite());

        let mut u = Bounds::empty();
        u.extend(Point::new(2.0, 2.0));
        u.union(&b);
        assert!(!u.is_finite());
    }
}
