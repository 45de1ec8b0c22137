//! Quadratic to cubic conversion.
//!
//! Each quadratic is raised to a cubic exactly. Between two explicit
//! on-curve points the raised cubics join smoothly, because an implied
//! on-curve point is always the midpoint of its neighbours; such a run is
//! then re-fitted with as few cubics as the tolerance allows.

use kurbo::{CubicBez, ParamCurve, Point, QuadBez};

use super::ConversionError;
use crate::outline::{Contour, Segment};
use crate::quadratic::{ContourPoint, QuadraticContour};

/// How many times an error curve may be halved before a merge is refused.
const MAX_SUBDIVISIONS: u32 = 8;

/// Convert a TrueType point stream into a contour of lines and cubics.
///
/// The contour keeps its direction; `contour` is its index, used for error
/// reporting.
pub fn contour_to_cubic(
    stream: &QuadraticContour,
    tolerance: f64,
    contour: usize,
) -> Result<Contour, ConversionError> {
    let points = stream.points();
    let first_on = points
        .iter()
        .position(|p| p.on_curve)
        .ok_or(ConversionError::NoOnCurvePoints { contour })?;
    let start = points[first_on].point;
    let rotated = points[first_on + 1..]
        .iter()
        .chain(&points[..first_on])
        .copied()
        .chain(std::iter::once(ContourPoint::on(start)));

    let mut segments = Vec::with_capacity(points.len());
    let mut current = start;
    let mut controls: Vec<Point> = Vec::new();
    for pt in rotated {
        if !pt.on_curve {
            if controls.last() == Some(&pt.point) {
                return Err(ConversionError::Degenerate { contour });
            }
            controls.push(pt.point);
            continue;
        }
        if controls.is_empty() {
            segments.push(Segment::LineTo(pt.point));
        } else {
            let run = raise_run(current, &controls, pt.point);
            segments.extend(
                merge_run(&run, tolerance)
                    .into_iter()
                    .map(|cubic| Segment::CubicTo(cubic.p1, cubic.p2, cubic.p3)),
            );
            controls.clear();
        }
        current = pt.point;
    }
    Ok(Contour::new(start, segments))
}

/// Raise the quadratics between two on-curve points to cubics.
fn raise_run(from: Point, controls: &[Point], to: Point) -> Vec<CubicBez> {
    let last = controls.len() - 1;
    controls
        .iter()
        .enumerate()
        .map(|(k, &control)| {
            let p0 = match k {
                0 => from,
                _ => controls[k - 1].midpoint(control),
            };
            let p2 = match k {
                _ if k == last => to,
                _ => control.midpoint(controls[k + 1]),
            };
            QuadBez::new(p0, control, p2).raise()
        })
        .collect()
}

/// Replace `pieces` with the fewest cubics that stay within `tolerance`.
fn merge_run(pieces: &[CubicBez], tolerance: f64) -> Vec<CubicBez> {
    let Some(&first) = pieces.first() else {
        return Vec::new();
    };
    // best[j]: (cubics needed for pieces[..j], start of the last one, its curve)
    let mut best: Vec<(usize, usize, CubicBez)> = Vec::with_capacity(pieces.len() + 1);
    best.push((0, 0, first));
    for j in 1..=pieces.len() {
        let mut choice = (best[j - 1].0 + 1, j - 1, pieces[j - 1]);
        for i in 0..j - 1 {
            if best[i].0 + 1 >= choice.0 {
                continue;
            }
            if let Some(merged) = merge(&pieces[i..j], tolerance) {
                choice = (best[i].0 + 1, i, merged);
            }
        }
        best.push(choice);
    }
    let mut merged = Vec::with_capacity(best[pieces.len()].0);
    let mut j = pieces.len();
    while j > 0 {
        let (_, from, cubic) = best[j];
        merged.push(cubic);
        j = from;
    }
    merged.reverse();
    merged
}

/// A single cubic through the ends of `pieces`, if it is close enough.
///
/// The pieces share a uniform parametrization, so piece `k` at `u`
/// corresponds to `(k + u) / n` on the merged curve and the merged
/// tangents are the end tangents scaled by `n`. Every point of every piece
/// is then within `tolerance` of the matching point of the merged curve.
fn merge(pieces: &[CubicBez], tolerance: f64) -> Option<CubicBez> {
    let (first, last) = (pieces.first()?, pieces.last()?);
    let n = pieces.len() as f64;
    let candidate = CubicBez::new(
        first.p0,
        first.p0 + (first.p1 - first.p0) * n,
        last.p3 + (last.p2 - last.p3) * n,
        last.p3,
    );
    for (k, piece) in pieces.iter().enumerate() {
        let span = candidate.subsegment(k as f64 / n..(k + 1) as f64 / n);
        let error = CubicBez::new(
            (span.p0 - piece.p0).to_point(),
            (span.p1 - piece.p1).to_point(),
            (span.p2 - piece.p2).to_point(),
            (span.p3 - piece.p3).to_point(),
        );
        if !within(error, tolerance, MAX_SUBDIVISIONS) {
            return None;
        }
    }
    Some(candidate)
}

/// `true` if every point of `error` lies within `tolerance` of the origin.
///
/// A curve lies in the convex hull of its control points, so the check
/// succeeds once all control points are close enough; otherwise the curve
/// is halved until that holds, an end point is too far, or `depth` runs
/// out. Running out refuses the merge.
fn within(error: CubicBez, tolerance: f64, depth: u32) -> bool {
    let norms = [error.p0, error.p1, error.p2, error.p3].map(|p| p.to_vec2().hypot());
    if norms.iter().all(|norm| *norm <= tolerance) {
        return true;
    }
    if norms[0] > tolerance || norms[3] > tolerance || depth == 0 {
        return false;
    }
    let (left, right) = error.subdivide();
    within(left, tolerance, depth - 1) && within(right, tolerance, depth - 1)
}
