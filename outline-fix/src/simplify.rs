//! The boolean geometry capability used by contour correction.
//!
//! Removing overlaps requires a path boolean engine; that engine is plugged
//! in through [`PathSimplifier`]. [`WindingSimplifier`] is the built-in
//! implementation: it orients contours by nesting depth and collapses
//! duplicated contours, but does not compute general unions.

use std::collections::HashSet;

use kurbo::{Line, PathEl, Point, Rect};

use crate::normalize::contour_key;
use crate::outline::{Contour, GlyphOutline, Winding};

/// An operation the geometry engine could not complete.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// A coordinate was NaN or infinite.
    NonFiniteCoordinate { contour: usize },
    /// Any other failure reported by an external engine.
    Engine(String),
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::NonFiniteCoordinate { contour } => {
                write!(f, "contour {contour} has a non-finite coordinate")
            }
            GeometryError::Engine(msg) => write!(f, "path operation failed: {msg}"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Boolean path operations on glyph outlines.
pub trait PathSimplifier {
    /// Remove overlaps from `outline` and orient its outer contours in the
    /// `winding` direction, holes in the opposite one.
    fn simplify(
        &self,
        outline: &GlyphOutline,
        winding: Winding,
    ) -> Result<GlyphOutline, GeometryError>;

    /// `true` if the filled areas of `a` and `b` have any point in common.
    fn intersects(&self, a: &GlyphOutline, b: &GlyphOutline) -> Result<bool, GeometryError>;
}

impl<T: PathSimplifier + ?Sized> PathSimplifier for &T {
    fn simplify(
        &self,
        outline: &GlyphOutline,
        winding: Winding,
    ) -> Result<GlyphOutline, GeometryError> {
        (**self).simplify(outline, winding)
    }

    fn intersects(&self, a: &GlyphOutline, b: &GlyphOutline) -> Result<bool, GeometryError> {
        (**self).intersects(a, b)
    }
}

/// A [`PathSimplifier`] that fixes contour direction without a boolean
/// engine.
///
/// * contours with no enclosed area are dropped;
/// * contours that repeat an earlier one (in either direction, from any
///   start point) are dropped;
/// * each remaining contour is oriented by how many others enclose it: an
///   even count is an outer contour, an odd count a hole.
///
/// Intersection tests flatten both outlines and report a hit on any edge
/// contact, or when one outline lies inside the other.
#[derive(Clone, Copy, Debug)]
pub struct WindingSimplifier {
    tolerance: f64,
}

impl WindingSimplifier {
    /// Create a simplifier that flattens curves to within `tolerance` units.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for WindingSimplifier {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl PathSimplifier for WindingSimplifier {
    fn simplify(
        &self,
        outline: &GlyphOutline,
        winding: Winding,
    ) -> Result<GlyphOutline, GeometryError> {
        check_finite(outline)?;
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for contour in outline.contours() {
            let polygon = flatten(contour, self.tolerance);
            if polygon_area(&polygon).abs() < 1e-9 {
                continue;
            }
            let key = contour_key(contour).min(contour_key(&contour.reversed()));
            if !seen.insert(key) {
                continue;
            }
            kept.push((contour, polygon));
        }

        let result = kept
            .iter()
            .enumerate()
            .map(|(i, (contour, polygon))| {
                let depth = kept
                    .iter()
                    .enumerate()
                    .filter(|(j, (_, other))| *j != i && encloses(other, polygon))
                    .count();
                let wants = match depth % 2 {
                    0 => winding,
                    _ => winding.opposite(),
                };
                let is_clockwise = polygon_area(polygon) < 0.0;
                if is_clockwise == (wants == Winding::Clockwise) {
                    (*contour).clone()
                } else {
                    contour.reversed()
                }
            })
            .collect();
        Ok(result)
    }

    fn intersects(&self, a: &GlyphOutline, b: &GlyphOutline) -> Result<bool, GeometryError> {
        check_finite(a)?;
        check_finite(b)?;
        let polys_a = flatten_all(a, self.tolerance);
        let polys_b = flatten_all(b, self.tolerance);
        let (Some(bounds_a), Some(bounds_b)) = (bounds(&polys_a), bounds(&polys_b)) else {
            return Ok(false);
        };
        if bounds_a.max_x() < bounds_b.min_x()
            || bounds_b.max_x() < bounds_a.min_x()
            || bounds_a.max_y() < bounds_b.min_y()
            || bounds_b.max_y() < bounds_a.min_y()
        {
            return Ok(false);
        }
        for pa in &polys_a {
            for pb in &polys_b {
                if edges(pa).any(|ea| edges(pb).any(|eb| lines_touch(ea, eb))) {
                    return Ok(true);
                }
            }
        }
        // no edge contact: either disjoint or one entirely inside the other
        let inside = |polygon: &[Point], region: &[Vec<Point>]| {
            polygon.first().is_some_and(|pt| {
                region
                    .iter()
                    .filter(|poly| point_in_polygon(*pt, poly))
                    .count()
                    % 2
                    == 1
            })
        };
        Ok(polys_a.iter().any(|p| inside(p, &polys_b))
            || polys_b.iter().any(|p| inside(p, &polys_a)))
    }
}

fn check_finite(outline: &GlyphOutline) -> Result<(), GeometryError> {
    for (i, contour) in outline.contours().iter().enumerate() {
        if contour.points().any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate { contour: i });
        }
    }
    Ok(())
}

/// Flatten a contour into a closed polygon (the closing vertex is not
/// repeated).
fn flatten(contour: &Contour, tolerance: f64) -> Vec<Point> {
    let mut polygon = Vec::new();
    kurbo::flatten(contour.to_bezpath(), tolerance, |el| match el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => polygon.push(p),
        _ => (),
    });
    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    polygon
}

fn flatten_all(outline: &GlyphOutline, tolerance: f64) -> Vec<Vec<Point>> {
    outline
        .contours()
        .iter()
        .map(|contour| flatten(contour, tolerance))
        .filter(|polygon| polygon.len() > 1)
        .collect()
}

fn bounds(polygons: &[Vec<Point>]) -> Option<Rect> {
    let mut points = polygons.iter().flatten();
    let first = *points.next()?;
    Some(points.fold(Rect::from_points(first, first), |rect, pt| {
        rect.union_pt(*pt)
    }))
}

fn polygon_area(polygon: &[Point]) -> f64 {
    let Some(&last) = polygon.last() else {
        return 0.0;
    };
    let mut prev = last;
    let mut twice_area = 0.0;
    for &pt in polygon {
        twice_area += prev.x * pt.y - pt.x * prev.y;
        prev = pt;
    }
    twice_area * 0.5
}

fn edges(polygon: &[Point]) -> impl Iterator<Item = Line> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| Line::new(polygon[i], polygon[(i + 1) % n]))
}

/// `true` if most vertices of `inner` lie inside `outer`.
///
/// Contours that do not cross are either nested or disjoint, so any vertex
/// would do; counting all of them tolerates vertices on a shared boundary.
fn encloses(outer: &[Point], inner: &[Point]) -> bool {
    let inside = inner
        .iter()
        .filter(|pt| point_in_polygon(**pt, outer))
        .count();
    inside * 2 > inner.len()
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// `true` if the two segments share at least one point.
fn lines_touch(a: Line, b: Line) -> bool {
    let d1 = orientation(b.p0, b.p1, a.p0);
    let d2 = orientation(b.p0, b.p1, a.p1);
    let d3 = orientation(a.p0, a.p1, b.p0);
    let d4 = orientation(a.p0, a.p1, b.p1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(b, a.p0))
        || (d2 == 0.0 && on_segment(b, a.p1))
        || (d3 == 0.0 && on_segment(a, b.p0))
        || (d4 == 0.0 && on_segment(a, b.p1))
}

fn orientation(p: Point, q: Point, r: Point) -> f64 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

/// Whether `pt`, known to be collinear with `line`, lies within its extent.
fn on_segment(line: Line, pt: Point) -> bool {
    pt.x >= line.p0.x.min(line.p1.x)
        && pt.x <= line.p0.x.max(line.p1.x)
        && pt.y >= line.p0.y.min(line.p1.y)
        && pt.y <= line.p0.y.max(line.p1.y)
}
