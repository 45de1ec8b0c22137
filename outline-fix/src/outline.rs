//! Format-neutral glyph outlines.
//!
//! A [`GlyphOutline`] is what every other module in this crate consumes:
//! the extractor produces one from `glyf` or `CFF ` data, the normalizer
//! rewrites it and the writer serializes it back into the font.

use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape};
use skrifa::outline::OutlinePen;

/// A single drawing command.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

impl Segment {
    /// The point at which this segment ends, if it has one.
    pub fn end_point(&self) -> Option<Point> {
        match self {
            Segment::MoveTo(p) | Segment::LineTo(p) => Some(*p),
            Segment::QuadTo(_, p) => Some(*p),
            Segment::CubicTo(_, _, p) => Some(*p),
            Segment::Close => None,
        }
    }

    /// Apply `f` to every point of the segment, controls included.
    pub fn map_points(self, mut f: impl FnMut(Point) -> Point) -> Self {
        match self {
            Segment::MoveTo(p) => Segment::MoveTo(f(p)),
            Segment::LineTo(p) => Segment::LineTo(f(p)),
            Segment::QuadTo(c, p) => Segment::QuadTo(f(c), f(p)),
            Segment::CubicTo(c0, c1, p) => Segment::CubicTo(f(c0), f(c1), f(p)),
            Segment::Close => Segment::Close,
        }
    }

    fn points(&self) -> impl Iterator<Item = Point> {
        let (pts, len) = match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => ([p, p, p], 1),
            Segment::QuadTo(c, p) => ([c, p, p], 2),
            Segment::CubicTo(c0, c1, p) => ([c0, c1, p], 3),
            Segment::Close => ([Point::ZERO; 3], 0),
        };
        pts.into_iter().take(len)
    }
}

/// A closed sequence of segments.
///
/// A contour always begins with [`Segment::MoveTo`] and ends with
/// [`Segment::Close`]. The closing edge back to the start point is implicit:
/// a final line segment that would end on the start point is never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    segments: Vec<Segment>,
}

impl Contour {
    /// Build a contour from a start point and the drawing segments that
    /// follow it.
    pub fn new(start: Point, segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut builder = OutlineBuilder::default();
        builder.begin(start);
        for segment in segments {
            builder.push(segment);
        }
        builder.finish_contour();
        builder.contours.pop().unwrap_or_default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The point passed to the initial `MoveTo`.
    pub fn start(&self) -> Option<Point> {
        self.segments.first().and_then(Segment::end_point)
    }

    /// Segments after the initial move, excluding the final close.
    pub fn drawing_segments(&self) -> &[Segment] {
        match self.segments.len() {
            0..=2 => &[],
            len => &self.segments[1..len - 1],
        }
    }

    /// The start point followed by the end point of each drawing segment.
    pub fn on_curve_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments.iter().filter_map(Segment::end_point)
    }

    /// Every point of the contour, off-curve controls included.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments.iter().flat_map(Segment::points)
    }

    pub fn has_cubics(&self) -> bool {
        self.segments
            .iter()
            .any(|seg| matches!(seg, Segment::CubicTo(..)))
    }

    pub fn has_quads(&self) -> bool {
        self.segments
            .iter()
            .any(|seg| matches!(seg, Segment::QuadTo(..)))
    }

    /// The shoelace area of the polygon through the on-curve points.
    ///
    /// Curves are approximated by their chord. The result is positive for
    /// counter-clockwise contours in a y-up coordinate system.
    pub fn signed_area(&self) -> f64 {
        let points: Vec<_> = self.on_curve_points().collect();
        let Some(&last) = points.last() else {
            return 0.0;
        };
        let mut prev = last;
        let mut twice_area = 0.0;
        for &pt in &points {
            twice_area += prev.x * pt.y - pt.x * prev.y;
            prev = pt;
        }
        twice_area * 0.5
    }

    /// Returns the same contour traversed in the opposite direction.
    ///
    /// The start point is preserved.
    pub fn reversed(&self) -> Contour {
        let Some(start) = self.start() else {
            return self.clone();
        };
        let drawing = self.drawing_segments();
        let mut segments = vec![Segment::MoveTo(start)];
        // the implicit closing edge becomes the first explicit one
        let last_end = drawing
            .last()
            .and_then(Segment::end_point)
            .unwrap_or(start);
        if last_end != start {
            segments.push(Segment::LineTo(last_end));
        }
        for (idx, segment) in drawing.iter().enumerate().rev() {
            let target = match idx {
                0 => start,
                _ => drawing[idx - 1].end_point().unwrap_or(start),
            };
            segments.push(match *segment {
                Segment::QuadTo(c, _) => Segment::QuadTo(c, target),
                Segment::CubicTo(c0, c1, _) => Segment::CubicTo(c1, c0, target),
                _ => Segment::LineTo(target),
            });
        }
        if segments.last() == Some(&Segment::LineTo(start)) {
            segments.pop();
        }
        segments.push(Segment::Close);
        Contour { segments }
    }

    pub fn transform(&self, affine: Affine) -> Contour {
        self.map_points(|p| affine * p)
    }

    pub fn map_points(&self, mut f: impl FnMut(Point) -> Point) -> Contour {
        let mut builder = OutlineBuilder::default();
        for segment in &self.segments {
            builder.push(segment.map_points(&mut f));
        }
        builder.finish().contours.pop().unwrap_or_default()
    }

    /// Draw this contour into `pen`.
    pub fn replay(&self, pen: &mut impl OutlinePen) {
        for segment in &self.segments {
            match *segment {
                Segment::MoveTo(p) => pen.move_to(p.x as f32, p.y as f32),
                Segment::LineTo(p) => pen.line_to(p.x as f32, p.y as f32),
                Segment::QuadTo(c, p) => {
                    pen.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32)
                }
                Segment::CubicTo(c0, c1, p) => pen.curve_to(
                    c0.x as f32,
                    c0.y as f32,
                    c1.x as f32,
                    c1.y as f32,
                    p.x as f32,
                    p.y as f32,
                ),
                Segment::Close => pen.close(),
            }
        }
    }

    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        self.append_to(&mut path);
        path
    }

    fn append_to(&self, path: &mut BezPath) {
        for segment in &self.segments {
            path.push(match *segment {
                Segment::MoveTo(p) => PathEl::MoveTo(p),
                Segment::LineTo(p) => PathEl::LineTo(p),
                Segment::QuadTo(c, p) => PathEl::QuadTo(c, p),
                Segment::CubicTo(c0, c1, p) => PathEl::CurveTo(c0, c1, p),
                Segment::Close => PathEl::ClosePath,
            });
        }
    }
}

/// The contours that make up one glyph.
///
/// A glyph with no contours (a space, for instance) is a valid outline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphOutline {
    contours: Vec<Contour>,
}

impl GlyphOutline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn into_contours(self) -> Vec<Contour> {
        self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn push(&mut self, contour: Contour) {
        if !contour.segments.is_empty() {
            self.contours.push(contour);
        }
    }

    /// Append the contours of `other` to this outline.
    pub fn extend(&mut self, other: GlyphOutline) {
        self.contours.extend(other.contours);
    }

    pub fn has_cubics(&self) -> bool {
        self.contours.iter().any(Contour::has_cubics)
    }

    pub fn has_quads(&self) -> bool {
        self.contours.iter().any(Contour::has_quads)
    }

    /// Every point of the outline, off-curve controls included.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.contours.iter().flat_map(Contour::points)
    }

    pub fn transform(&self, affine: Affine) -> GlyphOutline {
        self.map_points(|p| affine * p)
    }

    pub fn map_points(&self, mut f: impl FnMut(Point) -> Point) -> GlyphOutline {
        self.contours
            .iter()
            .map(|contour| contour.map_points(&mut f))
            .collect()
    }

    /// The same outline with every contour reversed.
    pub fn reversed(&self) -> GlyphOutline {
        GlyphOutline {
            contours: self.contours.iter().map(Contour::reversed).collect(),
        }
    }

    /// Draw the outline into `pen`.
    pub fn replay(&self, pen: &mut impl OutlinePen) {
        for contour in &self.contours {
            contour.replay(pen);
        }
    }

    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        for contour in &self.contours {
            contour.append_to(&mut path);
        }
        path
    }

    pub fn from_bezpath(path: &BezPath) -> GlyphOutline {
        let mut builder = OutlineBuilder::default();
        for el in path.elements() {
            builder.push(match *el {
                PathEl::MoveTo(p) => Segment::MoveTo(p),
                PathEl::LineTo(p) => Segment::LineTo(p),
                PathEl::QuadTo(c, p) => Segment::QuadTo(c, p),
                PathEl::CurveTo(c0, c1, p) => Segment::CubicTo(c0, c1, p),
                PathEl::ClosePath => Segment::Close,
            });
        }
        builder.finish()
    }

    /// The exact bounding box of the outline, including curve extrema.
    ///
    /// Returns `None` for an empty outline.
    pub fn bounds(&self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        Some(self.to_bezpath().bounding_box())
    }

    /// The bounding box of all points, off-curve controls included.
    pub fn control_bounds(&self) -> Option<Rect> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold(Rect::from_points(first, first), |rect, pt| {
            rect.union_pt(pt)
        }))
    }
}

impl FromIterator<Contour> for GlyphOutline {
    fn from_iter<T: IntoIterator<Item = Contour>>(iter: T) -> Self {
        let mut outline = GlyphOutline::new();
        for contour in iter {
            outline.push(contour);
        }
        outline
    }
}

/// The direction in which outer contours are drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Winding {
    /// TrueType convention.
    Clockwise,
    /// PostScript convention.
    CounterClockwise,
}

impl Winding {
    /// The area of `contour`, positive when it runs in this direction.
    pub fn oriented_area(self, contour: &Contour) -> f64 {
        match self {
            Winding::Clockwise => -contour.signed_area(),
            Winding::CounterClockwise => contour.signed_area(),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Winding::Clockwise => Winding::CounterClockwise,
            Winding::CounterClockwise => Winding::Clockwise,
        }
    }
}

/// The curve basis of a font's outlines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OutlineFormat {
    /// Quadratic curves in the `glyf` table.
    TrueType,
    /// Cubic curves in the `CFF ` table.
    PostScript,
}

impl OutlineFormat {
    pub fn winding(self) -> Winding {
        match self {
            OutlineFormat::TrueType => Winding::Clockwise,
            OutlineFormat::PostScript => Winding::CounterClockwise,
        }
    }
}

/// A pen that collects drawing commands into a [`GlyphOutline`].
///
/// Open sub-paths are closed when the next one begins or the outline is
/// finished; a move that is not followed by any drawing is discarded.
#[derive(Clone, Debug, Default)]
pub struct OutlineBuilder {
    contours: Vec<Contour>,
    current: Vec<Segment>,
    last_point: Point,
}

impl OutlineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish any open contour and return the outline.
    pub fn finish(mut self) -> GlyphOutline {
        self.finish_contour();
        GlyphOutline {
            contours: self.contours,
        }
    }

    fn begin(&mut self, start: Point) {
        self.finish_contour();
        self.current.push(Segment::MoveTo(start));
        self.last_point = start;
    }

    pub(crate) fn push(&mut self, segment: Segment) {
        match segment {
            Segment::MoveTo(p) => self.begin(p),
            Segment::Close => self.finish_contour(),
            _ => {
                if self.current.is_empty() {
                    self.current.push(Segment::MoveTo(self.last_point));
                }
                if let Some(end) = segment.end_point() {
                    self.last_point = end;
                }
                self.current.push(segment);
            }
        }
    }

    fn finish_contour(&mut self) {
        if self.current.len() < 2 {
            self.current.clear();
            return;
        }
        let start = self.current[0].end_point();
        if let Some(Segment::LineTo(end)) = self.current.last() {
            if Some(*end) == start {
                self.current.pop();
            }
        }
        if self.current.len() < 2 {
            self.current.clear();
            return;
        }
        self.current.push(Segment::Close);
        self.contours.push(Contour {
            segments: std::mem::take(&mut self.current),
        });
    }
}

impl OutlinePen for OutlineBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.push(Segment::MoveTo(point(x, y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(Segment::LineTo(point(x, y)));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.push(Segment::QuadTo(point(cx0, cy0), point(x, y)));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.push(Segment::CubicTo(
            point(cx0, cy0),
            point(cx1, cy1),
            point(x, y),
        ));
    }

    fn close(&mut self) {
        self.push(Segment::Close);
    }
}

fn point(x: f32, y: f32) -> Point {
    Point::new(x as f64, y as f64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn rect_contour(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
        // counter-clockwise in y-up space
        Contour::new(
            Point::new(x0, y0),
            [
                Segment::LineTo(Point::new(x1, y0)),
                Segment::LineTo(Point::new(x1, y1)),
                Segment::LineTo(Point::new(x0, y1)),
            ],
        )
    }

    #[test]
    fn builder_closes_open_paths() {
        let mut pen = OutlineBuilder::new();
        pen.move_to(0.0, 0.0);
        pen.line_to(10.0, 0.0);
        pen.line_to(10.0, 10.0);
        pen.move_to(20.0, 20.0);
        pen.line_to(30.0, 20.0);
        pen.line_to(30.0, 30.0);
        pen.close();
        let outline = pen.finish();
        assert_eq!(outline.len(), 2);
        for contour in outline.contours() {
            assert!(matches!(contour.segments()[0], Segment::MoveTo(_)));
            assert_eq!(contour.segments().last(), Some(&Segment::Close));
        }
    }

    #[test]
    fn builder_drops_lone_moves_and_closing_lines() {
        let mut pen = OutlineBuilder::new();
        pen.move_to(5.0, 5.0);
        pen.move_to(0.0, 0.0);
        pen.line_to(10.0, 0.0);
        pen.line_to(10.0, 10.0);
        pen.line_to(0.0, 0.0);
        pen.close();
        let outline = pen.finish();
        assert_eq!(outline.len(), 1);
        assert_eq!(
            outline.contours()[0].segments(),
            &[
                Segment::MoveTo(Point::new(0.0, 0.0)),
                Segment::LineTo(Point::new(10.0, 0.0)),
                Segment::LineTo(Point::new(10.0, 10.0)),
                Segment::Close,
            ]
        );
    }

    #[test]
    fn area_sign() {
        let ccw = rect_contour(0.0, 0.0, 10.0, 20.0);
        assert_eq!(ccw.signed_area(), 200.0);
        assert_eq!(Winding::CounterClockwise.oriented_area(&ccw), 200.0);
        assert_eq!(Winding::Clockwise.oriented_area(&ccw), -200.0);
        assert_eq!(ccw.reversed().signed_area(), -200.0);
    }

    #[test]
    fn area_uses_curve_chords() {
        let contour = Contour::new(
            Point::new(0.0, 0.0),
            [
                Segment::LineTo(Point::new(10.0, 0.0)),
                Segment::QuadTo(Point::new(100.0, 100.0), Point::new(10.0, 10.0)),
                Segment::LineTo(Point::new(0.0, 10.0)),
            ],
        );
        assert_eq!(contour.signed_area(), 100.0);
    }

    #[test]
    fn reverse_keeps_start_point() {
        let contour = Contour::new(
            Point::new(0.0, 0.0),
            [
                Segment::LineTo(Point::new(10.0, 0.0)),
                Segment::CubicTo(
                    Point::new(15.0, 5.0),
                    Point::new(15.0, 10.0),
                    Point::new(10.0, 15.0),
                ),
            ],
        );
        let reversed = contour.reversed();
        assert_eq!(
            reversed.segments(),
            &[
                Segment::MoveTo(Point::new(0.0, 0.0)),
                Segment::LineTo(Point::new(10.0, 15.0)),
                Segment::CubicTo(
                    Point::new(15.0, 10.0),
                    Point::new(15.0, 5.0),
                    Point::new(10.0, 0.0),
                ),
                Segment::Close,
            ]
        );
        assert_eq!(reversed.reversed(), contour);
    }

    #[test]
    fn bezpath_conversion() {
        let outline: GlyphOutline = [rect_contour(0.0, 0.0, 5.0, 5.0)].into_iter().collect();
        let path = outline.to_bezpath();
        assert_eq!(path.to_svg(), "M0,0 L5,0 L5,5 L0,5 Z");
        assert_eq!(GlyphOutline::from_bezpath(&path), outline);
    }

    #[test]
    fn bounds_include_curve_extrema() {
        let contour = Contour::new(
            Point::new(0.0, 0.0),
            [Segment::QuadTo(Point::new(50.0, 100.0), Point::new(100.0, 0.0))],
        );
        let outline: GlyphOutline = [contour].into_iter().collect();
        let bounds = outline.bounds().unwrap();
        assert_eq!(bounds.max_y(), 50.0);
        assert_eq!(outline.control_bounds().unwrap().max_y(), 100.0);
    }
}
