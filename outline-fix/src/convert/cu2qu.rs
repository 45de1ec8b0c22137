//! Cubic to quadratic approximation.

use kurbo::CubicBez;

use super::ConversionError;
use crate::outline::{Contour, GlyphOutline, Segment};
use crate::quadratic::{ContourPoint, QuadraticContour};

/// Approximate every cubic of `outline` with quadratic splines.
///
/// Contours are reversed, so counter-clockwise PostScript contours become
/// clockwise TrueType ones. Consecutive off-curve points of a spline leave
/// their on-curve midpoints implied.
pub fn cubic_to_quadratic(
    outline: &GlyphOutline,
    tolerance: f64,
) -> Result<Vec<QuadraticContour>, ConversionError> {
    outline
        .contours()
        .iter()
        .enumerate()
        .map(|(ix, contour)| {
            spline_points(&contour.reversed(), tolerance)
                .ok_or(ConversionError::Approximation { contour: ix })
        })
        .collect()
}

/// Approximate the cubics of a single contour, keeping its direction.
///
/// Each spline is split into separate quadratic segments, so every segment
/// boundary is an explicit on-curve point. Returns `None` if a cubic cannot
/// be approximated within `tolerance`.
pub fn contour_to_quadratic(contour: &Contour, tolerance: f64) -> Option<Contour> {
    let start = contour.start()?;
    let mut current = start;
    let mut segments = Vec::with_capacity(contour.drawing_segments().len());
    for segment in contour.drawing_segments() {
        match *segment {
            Segment::CubicTo(c0, c1, p) => {
                let spline = CubicBez::new(current, c0, c1, p).approx_spline(tolerance)?;
                segments.extend(spline.to_quads().map(|quad| Segment::QuadTo(quad.p1, quad.p2)));
            }
            other => segments.push(other),
        }
        current = segment.end_point().unwrap_or(current);
    }
    Some(Contour::new(start, segments))
}

fn spline_points(contour: &Contour, tolerance: f64) -> Option<QuadraticContour> {
    let Some(start) = contour.start() else {
        return Some(QuadraticContour::default());
    };
    let mut points = vec![ContourPoint::on(start)];
    let mut current = start;
    for segment in contour.drawing_segments() {
        match *segment {
            Segment::LineTo(p) => points.push(ContourPoint::on(p)),
            Segment::QuadTo(c, p) => {
                points.push(ContourPoint::off(c));
                points.push(ContourPoint::on(p));
            }
            Segment::CubicTo(c0, c1, p) => {
                let spline = CubicBez::new(current, c0, c1, p).approx_spline(tolerance)?;
                let controls = spline.points();
                // the first and last points are the ends of the cubic
                let interior = controls.get(1..controls.len().saturating_sub(1)).unwrap_or_default();
                points.extend(interior.iter().copied().map(ContourPoint::off));
                points.push(ContourPoint::on(p));
            }
            Segment::MoveTo(_) | Segment::Close => (),
        }
        current = segment.end_point().unwrap_or(current);
    }
    if points.len() > 1 && points.last() == Some(&ContourPoint::on(start)) {
        points.pop();
    }
    Some(QuadraticContour::new(points))
}
