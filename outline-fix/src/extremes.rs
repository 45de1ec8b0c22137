//! Adding on-curve points at the extremes of curves.
//!
//! PostScript hinting and most font validators expect a point wherever a
//! curve reaches its horizontal or vertical extreme. [`insert_extremes`]
//! splits each curve at those parameters and makes the handles on either
//! side of the new point horizontal or vertical.

use kurbo::{CubicBez, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, Point, QuadBez, Vec2};
use skrifa::GlyphId;
use write_fonts::OtRound;

use crate::batch::{run_batch, BatchPolicy, BatchReport};
use crate::font::OutlineFont;
use crate::normalize::{round_outline, same_outline};
use crate::outline::{Contour, GlyphOutline, Segment};
use crate::BatchError;

/// Extremes closer than this to a point the curve already has are skipped.
const MIN_PIECE: f64 = 1.0;

/// Split every curve of `outline` at its horizontal and vertical extremes.
///
/// New points are rounded to integers. Lines and curves whose extremes
/// are already at their ends are unchanged.
pub fn insert_extremes(outline: &GlyphOutline) -> GlyphOutline {
    outline.contours().iter().map(contour_with_extremes).collect()
}

fn contour_with_extremes(contour: &Contour) -> Contour {
    let Some(start) = contour.start() else {
        return contour.clone();
    };
    let mut current = start;
    let mut segments = Vec::with_capacity(contour.drawing_segments().len());
    for segment in contour.drawing_segments() {
        match *segment {
            Segment::QuadTo(c, p) => {
                let pieces = split_quad(QuadBez::new(current, c, p));
                segments.extend(pieces.iter().map(|q| Segment::QuadTo(q.p1, q.p2)));
            }
            Segment::CubicTo(c0, c1, p) => {
                let pieces = split_cubic(CubicBez::new(current, c0, c1, p));
                segments.extend(
                    pieces
                        .iter()
                        .map(|c| Segment::CubicTo(c.p1, c.p2, c.p3)),
                );
            }
            other => segments.push(other),
        }
        current = segment.end_point().unwrap_or(current);
    }
    Contour::new(start, segments)
}

/// The extreme parameters of a curve that are worth a new point.
fn split_params(ts: impl IntoIterator<Item = f64>, eval: impl Fn(f64) -> Point) -> Vec<f64> {
    let (start, end) = (eval(0.0), eval(1.0));
    let mut last = start;
    let mut kept = Vec::new();
    for t in ts {
        let at = eval(t);
        if at.distance(last) < MIN_PIECE || at.distance(end) < MIN_PIECE {
            continue;
        }
        kept.push(t);
        last = at;
    }
    kept
}

fn bounds(ts: &[f64]) -> Vec<f64> {
    std::iter::once(0.0)
        .chain(ts.iter().copied())
        .chain(std::iter::once(1.0))
        .collect()
}

fn round_point(pt: Point) -> Point {
    let x: f64 = pt.x.ot_round();
    let y: f64 = pt.y.ot_round();
    Point::new(x, y)
}

/// `true` if the curve is vertical where its tangent is `tangent`, so the
/// extreme is in x.
fn is_vertical(tangent: Vec2) -> bool {
    tangent.x.abs() <= tangent.y.abs()
}

/// Move `handle` onto the axis line through `at`.
fn snap(handle: &mut Point, at: Point, vertical: bool) {
    match vertical {
        true => handle.x = at.x,
        false => handle.y = at.y,
    }
}

fn split_cubic(cubic: CubicBez) -> Vec<CubicBez> {
    let ts = split_params(cubic.extrema(), |t| cubic.eval(t));
    if ts.is_empty() {
        return vec![cubic];
    }
    let mut pieces: Vec<CubicBez> = bounds(&ts)
        .windows(2)
        .map(|w| cubic.subsegment(w[0]..w[1]))
        .collect();
    let deriv = cubic.deriv();
    for (k, &t) in ts.iter().enumerate() {
        let at = round_point(pieces[k].p3);
        let vertical = is_vertical(deriv.eval(t).to_vec2());
        pieces[k].p3 = at;
        pieces[k + 1].p0 = at;
        snap(&mut pieces[k].p2, at, vertical);
        snap(&mut pieces[k + 1].p1, at, vertical);
    }
    pieces
}

fn split_quad(quad: QuadBez) -> Vec<QuadBez> {
    let ts = split_params(quad.extrema(), |t| quad.eval(t));
    if ts.is_empty() {
        return vec![quad];
    }
    let mut pieces: Vec<QuadBez> = bounds(&ts)
        .windows(2)
        .map(|w| quad.subsegment(w[0]..w[1]))
        .collect();
    let deriv = quad.deriv();
    for (k, &t) in ts.iter().enumerate() {
        let at = round_point(pieces[k].p2);
        let vertical = is_vertical(deriv.eval(t).to_vec2());
        pieces[k].p2 = at;
        pieces[k + 1].p0 = at;
        snap(&mut pieces[k].p1, at, vertical);
        snap(&mut pieces[k + 1].p1, at, vertical);
    }
    pieces
}

impl OutlineFont {
    /// Add a point at every horizontal and vertical extreme of every curve.
    ///
    /// Composite `glyf` glyphs are left alone; their components get the
    /// points instead. Coordinates of changed glyphs are rounded to
    /// integers.
    pub fn add_extremes(&mut self, policy: BatchPolicy) -> Result<BatchReport, BatchError> {
        let order: Vec<_> = (0..self.num_glyphs() as u32).map(GlyphId::new).collect();
        log::info!("adding extremes to {} glyphs", order.len());
        let report = run_batch(self, &order, policy, |font, gid| {
            if font.is_composite(gid) {
                return Ok(None);
            }
            let outline = font.outline(gid, false)?;
            let with_extremes = insert_extremes(&outline);
            if with_extremes == outline {
                return Ok(None);
            }
            let rounded = round_outline(&with_extremes);
            Ok((!same_outline(&rounded, &outline)).then_some(rounded))
        })?;
        log::info!("{} glyphs modified", report.modified().len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::batch::GlyphState;
    use crate::outline::tests::rect_contour;
    use crate::test_support::{self, TestGlyph};

    fn curve_ends(contour: &Contour) -> Vec<Point> {
        contour.on_curve_points().collect()
    }

    /// A circle of four cubics that start halfway between the extremes.
    fn rotated_circle(r: f64) -> Contour {
        let k = r * 0.552_284_749_831;
        let d = std::f64::consts::FRAC_1_SQRT_2;
        let on = |x: f64, y: f64| Point::new((x * d - y * d) * r, (x * d + y * d) * r);
        let off = |x: f64, y: f64, dx: f64, dy: f64| {
            let p = on(x, y);
            let v = Vec2::new((dx * d - dy * d) * k, (dx * d + dy * d) * k);
            (p + v, p)
        };
        // the unrotated circle starts at (1, 0); handles are tangents
        let (a_out, a) = off(1.0, 0.0, 0.0, 1.0);
        let (b_in, b) = off(0.0, 1.0, 1.0, 0.0);
        let (b_out, _) = off(0.0, 1.0, -1.0, 0.0);
        let (c_in, c) = off(-1.0, 0.0, 0.0, 1.0);
        let (c_out, _) = off(-1.0, 0.0, 0.0, -1.0);
        let (d_in, dd) = off(0.0, -1.0, -1.0, 0.0);
        let (d_out, _) = off(0.0, -1.0, 1.0, 0.0);
        let (a_in, _) = off(1.0, 0.0, 0.0, -1.0);
        Contour::new(
            a,
            [
                Segment::CubicTo(a_out, b_in, b),
                Segment::CubicTo(b_out, c_in, c),
                Segment::CubicTo(c_out, d_in, dd),
                Segment::CubicTo(d_out, a_in, a),
            ],
        )
    }

    #[test]
    fn lines_and_extreme_ends_are_kept() {
        let outline: GlyphOutline = [
            rect_contour(0.0, 0.0, 100.0, 50.0),
            // a quarter circle already has points at its extremes
            Contour::new(
                Point::new(100.0, 0.0),
                [
                    Segment::CubicTo(
                        Point::new(100.0, 55.0),
                        Point::new(55.0, 100.0),
                        Point::new(0.0, 100.0),
                    ),
                    Segment::LineTo(Point::new(0.0, 0.0)),
                ],
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(insert_extremes(&outline), outline);
    }

    #[test]
    fn cubic_extremes() {
        let outline: GlyphOutline = [rotated_circle(500.0)].into_iter().collect();
        let split = insert_extremes(&outline);
        let contour = &split.contours()[0];
        assert_eq!(contour.drawing_segments().len(), 8);
        let ends = curve_ends(contour);
        for expected in [(500.0, 0.0), (0.0, 500.0), (-500.0, 0.0), (0.0, -500.0)] {
            let expected = Point::new(expected.0, expected.1);
            assert!(ends.contains(&expected), "{expected:?} missing from {ends:?}");
        }
        // handles around the new points are axis aligned
        let mut prev = contour.start().unwrap();
        for seg in contour.drawing_segments() {
            let Segment::CubicTo(c0, c1, p) = *seg else {
                panic!("unexpected {seg:?}");
            };
            if prev.x.abs() == 500.0 {
                assert_eq!(c0.x, prev.x);
            }
            if prev.y.abs() == 500.0 {
                assert_eq!(c0.y, prev.y);
            }
            if p.x.abs() == 500.0 {
                assert_eq!(c1.x, p.x);
            }
            if p.y.abs() == 500.0 {
                assert_eq!(c1.y, p.y);
            }
            // no piece has an extreme left inside it
            let piece = CubicBez::new(prev, c0, c1, p);
            assert!(split_params(piece.extrema(), |t| piece.eval(t)).is_empty());
            prev = p;
        }
        // a second pass adds nothing
        assert_eq!(insert_extremes(&split), split);
    }

    #[test]
    fn quadratic_extremes() {
        // a parabola peaking at (50, 50)
        let outline: GlyphOutline = [Contour::new(
            Point::new(0.0, 0.0),
            [Segment::QuadTo(Point::new(50.0, 100.0), Point::new(100.0, 0.0))],
        )]
        .into_iter()
        .collect();
        let split = insert_extremes(&outline);
        assert_eq!(
            split.contours()[0].drawing_segments(),
            [
                Segment::QuadTo(Point::new(25.0, 50.0), Point::new(50.0, 50.0)),
                Segment::QuadTo(Point::new(75.0, 50.0), Point::new(100.0, 0.0)),
            ]
        );
    }

    #[test]
    fn extremes_near_ends_are_skipped() {
        // the x extreme is a fraction of a unit from the start point
        let cubic = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(-1.0, 10.0),
            Point::new(50.0, 10.0),
            Point::new(100.0, 0.0),
        );
        assert_eq!(cubic.extrema().len(), 2);
        let kept = split_params(cubic.extrema(), |t| cubic.eval(t));
        assert_eq!(kept.len(), 1);
        assert!((kept[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn font_gets_extremes() {
        let data = test_support::glyf_font(&[
            (".notdef", TestGlyph::empty()),
            ("bar", TestGlyph::rect(0, 0, 100, 200)),
            (
                "arch",
                TestGlyph::contours(&[&[(0, 0, true), (50, 100, false), (100, 0, true)]]),
            ),
            ("dbl", TestGlyph::composite(&[(2, 0, 0), (2, 200, 0)])),
        ]);
        let mut font = OutlineFont::new(&data).unwrap();
        let report = font.add_extremes(BatchPolicy::default()).unwrap();
        assert_eq!(report.modified().iter().collect::<Vec<_>>(), ["arch"]);
        assert_eq!(report.state("bar"), Some(GlyphState::Skipped));
        assert_eq!(report.state("dbl"), Some(GlyphState::Skipped));
        let arch = font.outline_by_name("arch", false).unwrap();
        assert!(curve_ends(&arch.contours()[0]).contains(&Point::new(50.0, 50.0)));
        let dbl = font.glyph_id("dbl").unwrap();
        assert!(font.is_composite(dbl));
        // the composite picks up its component's new point
        let dbl = font.outline(dbl, true).unwrap();
        assert!(curve_ends(&dbl.contours()[1]).contains(&Point::new(250.0, 50.0)));
        assert!(!font.add_extremes(BatchPolicy::default()).unwrap().needs_save());
    }

    #[test]
    fn cff_font_gets_extremes() {
        let data = test_support::cff_font(&[
            (".notdef", TestGlyph::empty()),
            ("o", TestGlyph::rect(0, 0, 10, 10)),
        ]);
        let mut font = OutlineFont::new(&data).unwrap();
        let o = font.glyph_id("o").unwrap();
        let circle = rotated_circle(300.0).map_points(|pt| pt + Vec2::new(400.0, 400.0));
        let circle: GlyphOutline = [circle].into_iter().collect();
        font.commit(o, &round_outline(&circle)).unwrap();
        let report = font.add_extremes(BatchPolicy::default()).unwrap();
        assert_eq!(report.modified().iter().collect::<Vec<_>>(), ["o"]);
        let outline = font.outline(o, false).unwrap();
        let ends = curve_ends(&outline.contours()[0]);
        assert!(ends.contains(&Point::new(100.0, 400.0)));
        assert!(ends.contains(&Point::new(700.0, 400.0)));
        assert!(ends.contains(&Point::new(400.0, 100.0)));
        assert!(ends.contains(&Point::new(400.0, 700.0)));
        assert_eq!(font.metrics(o).unwrap().lsb, 100);
    }
}
