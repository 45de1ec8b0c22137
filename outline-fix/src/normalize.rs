//! Contour normalization: overlap removal, winding and tiny contour cleanup.

use kurbo::Point;
use write_fonts::OtRound;

use crate::outline::{Contour, GlyphOutline, Segment, Winding};
use crate::simplify::PathSimplifier;
use crate::Error;

/// Simplify `outline` and orient it in the `winding` direction.
///
/// If the simplifier fails, it is retried once on a copy of the outline
/// with every coordinate rounded to an integer; a second failure is
/// reported as [`Error::Geometry`] for `glyph_name`.
///
/// When `min_area` is non-zero, contours whose absolute area is smaller are
/// removed from the result.
pub fn normalize<S: PathSimplifier + ?Sized>(
    outline: &GlyphOutline,
    winding: Winding,
    min_area: u32,
    simplifier: &S,
    glyph_name: &str,
) -> Result<GlyphOutline, Error> {
    let simplified = match simplifier.simplify(outline, winding) {
        Ok(simplified) => simplified,
        Err(error) => {
            log::debug!("simplifying '{glyph_name}' failed ({error}), retrying with rounded coordinates");
            simplifier
                .simplify(&round_outline(outline), winding)
                .map_err(|source| Error::Geometry {
                    glyph: glyph_name.to_owned(),
                    source,
                })?
        }
    };
    if min_area == 0 {
        return Ok(simplified);
    }
    Ok(remove_tiny_contours(&simplified, min_area as f64))
}

/// Round every coordinate with OpenType rounding (`floor(x + 0.5)`).
pub fn round_outline(outline: &GlyphOutline) -> GlyphOutline {
    outline.map_points(|pt| {
        let x: f64 = pt.x.ot_round();
        let y: f64 = pt.y.ot_round();
        Point::new(x, y)
    })
}

/// Remove contours whose absolute area is below `min_area`.
///
/// The area is that of the polygon through the on-curve points.
pub fn remove_tiny_contours(outline: &GlyphOutline, min_area: f64) -> GlyphOutline {
    outline
        .contours()
        .iter()
        .filter(|contour| contour.signed_area().abs() >= min_area)
        .cloned()
        .collect()
}

/// The signed area of a contour; positive means counter-clockwise.
pub fn signed_area(contour: &Contour) -> f64 {
    contour.signed_area()
}

/// `true` if both outlines contain the same contours, each the same number
/// of times.
///
/// Contour order and the choice of start point do not matter; the direction
/// of each contour does.
pub fn same_outline(a: &GlyphOutline, b: &GlyphOutline) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let keys = |outline: &GlyphOutline| -> Vec<ContourKey> {
        let mut keys: Vec<_> = outline.contours().iter().map(contour_key).collect();
        keys.sort_unstable();
        keys
    };
    keys(a) == keys(b)
}

/// A contour's edges as comparable bit patterns, rotated to a canonical
/// start.
pub(crate) type ContourKey = Vec<EdgeKey>;

pub(crate) type EdgeKey = (u8, [u64; 6]);

pub(crate) fn contour_key(contour: &Contour) -> ContourKey {
    fn bits(pt: Point) -> [u64; 2] {
        // adding zero folds -0.0 into 0.0
        [(pt.x + 0.0).to_bits(), (pt.y + 0.0).to_bits()]
    }
    fn edge(kind: u8, points: &[Point]) -> EdgeKey {
        let mut key = [0u64; 6];
        for (i, pt) in points.iter().enumerate() {
            key[i * 2..i * 2 + 2].copy_from_slice(&bits(*pt));
        }
        (kind, key)
    }

    let Some(start) = contour.start() else {
        return Vec::new();
    };
    let mut edges: Vec<EdgeKey> = contour
        .drawing_segments()
        .iter()
        .filter_map(|segment| match *segment {
            Segment::LineTo(p) => Some(edge(0, &[p])),
            Segment::QuadTo(c, p) => Some(edge(1, &[c, p])),
            Segment::CubicTo(c0, c1, p) => Some(edge(2, &[c0, c1, p])),
            Segment::MoveTo(_) | Segment::Close => None,
        })
        .collect();
    let last_end = contour
        .drawing_segments()
        .last()
        .and_then(Segment::end_point)
        .unwrap_or(start);
    if last_end != start {
        edges.push(edge(0, &[start]));
    }
    (0..edges.len())
        .map(|i| {
            let mut rotated = edges.clone();
            rotated.rotate_left(i);
            rotated
        })
        .min()
        .unwrap_or_default()
}
