//! Finding and cleaning up outline defects.
//!
//! [`find_issues`] reports the problems outline checkers flag: degenerate
//! segments, curves that are really lines, points in the middle of straight
//! lines, tiny contours, wrong directions and overlaps. [`clean_outline`]
//! fixes the first three; the rest is the job of contour correction.

use std::fmt;

use kurbo::{Line, ParamCurveNearest, Point};
use skrifa::GlyphId;

use crate::batch::{run_batch, BatchPolicy, BatchReport};
use crate::font::OutlineFont;
use crate::normalize::{contour_key, same_outline};
use crate::outline::{Contour, GlyphOutline, Segment, Winding};
use crate::overlap::components_overlap;
use crate::simplify::{GeometryError, PathSimplifier};
use crate::{BatchError, ContourOptions, Error};

/// Control points closer than this to the chord make a curve flat.
const FLAT_TOLERANCE: f64 = 0.1;
/// Points closer than this to the line through their neighbours are redundant.
const COLLINEAR_TOLERANCE: f64 = 0.01;

/// A defect in one glyph.
#[derive(Clone, Debug, PartialEq)]
pub enum OutlineIssue {
    /// A segment that starts and ends on the same point.
    ZeroLengthSegment { contour: usize, at: Point },
    /// A curve whose control points lie on its chord.
    FlatCurve { contour: usize, at: Point },
    /// An on-curve point between two collinear lines.
    RedundantPoint { contour: usize, at: Point },
    TinyContour { contour: usize, area: f64 },
    WrongDirection { contour: usize },
    /// A contour the simplifier had to rewrite: it crosses itself or
    /// another contour, or duplicates one.
    Overlap { contour: usize },
    /// Components of a composite glyph that intersect.
    OverlappingComponents,
}

impl fmt::Display for OutlineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlineIssue::ZeroLengthSegment { contour, at } => {
                write!(f, "contour {contour}: zero-length segment at ({}, {})", at.x, at.y)
            }
            OutlineIssue::FlatCurve { contour, at } => {
                write!(f, "contour {contour}: flat curve ending at ({}, {})", at.x, at.y)
            }
            OutlineIssue::RedundantPoint { contour, at } => {
                write!(f, "contour {contour}: redundant point at ({}, {})", at.x, at.y)
            }
            OutlineIssue::TinyContour { contour, area } => {
                write!(f, "contour {contour}: area {area} is too small")
            }
            OutlineIssue::WrongDirection { contour } => {
                write!(f, "contour {contour}: wrong direction")
            }
            OutlineIssue::Overlap { contour } => write!(f, "contour {contour}: overlap"),
            OutlineIssue::OverlappingComponents => f.write_str("components overlap"),
        }
    }
}

/// The issues found in one glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphIssues {
    pub glyph: String,
    pub issues: Vec<OutlineIssue>,
}

/// An edge of a contour, the implicit closing line included.
#[derive(Clone, Copy, Debug)]
struct Edge {
    from: Point,
    segment: Segment,
}

impl Edge {
    fn to(&self) -> Point {
        self.segment.end_point().unwrap_or(self.from)
    }

    fn is_line(&self) -> bool {
        matches!(self.segment, Segment::LineTo(_))
    }

    fn is_point(&self) -> bool {
        let from = self.from;
        match self.segment {
            Segment::LineTo(p) => p == from,
            Segment::QuadTo(c, p) => c == from && p == from,
            Segment::CubicTo(c0, c1, p) => c0 == from && c1 == from && p == from,
            Segment::MoveTo(_) | Segment::Close => true,
        }
    }

    fn is_flat(&self) -> bool {
        let chord = Line::new(self.from, self.to());
        let near = |c: Point| chord.nearest(c, 1e-9).distance_sq <= FLAT_TOLERANCE * FLAT_TOLERANCE;
        match self.segment {
            Segment::QuadTo(c, _) => near(c),
            Segment::CubicTo(c0, c1, _) => near(c0) && near(c1),
            _ => false,
        }
    }
}

fn edges(contour: &Contour) -> Vec<Edge> {
    let Some(start) = contour.start() else {
        return Vec::new();
    };
    let mut from = start;
    let mut edges = Vec::with_capacity(contour.drawing_segments().len() + 1);
    for segment in contour.drawing_segments() {
        edges.push(Edge {
            from,
            segment: *segment,
        });
        from = segment.end_point().unwrap_or(from);
    }
    if from != start {
        edges.push(Edge {
            from,
            segment: Segment::LineTo(start),
        });
    }
    edges
}

/// `true` if the point joining `incoming` and `outgoing` can be dropped.
fn is_redundant(incoming: &Edge, outgoing: &Edge) -> bool {
    if !incoming.is_line() || !outgoing.is_line() || incoming.is_point() || outgoing.is_point() {
        return false;
    }
    let through = Line::new(incoming.from, outgoing.to());
    through.nearest(incoming.to(), 1e-9).distance_sq <= COLLINEAR_TOLERANCE * COLLINEAR_TOLERANCE
}

/// Report the defects of `outline`.
///
/// Contours with an absolute area below `min_area` are reported as tiny and
/// not checked for direction or overlaps. Direction and overlaps are judged
/// by comparing each contour with the output of `simplifier`.
pub fn find_issues<S: PathSimplifier + ?Sized>(
    outline: &GlyphOutline,
    winding: Winding,
    min_area: u32,
    simplifier: &S,
) -> Result<Vec<OutlineIssue>, GeometryError> {
    let mut issues = Vec::new();
    let mut tiny = vec![false; outline.len()];
    for (contour_ix, contour) in outline.contours().iter().enumerate() {
        let edges = edges(contour);
        for (i, edge) in edges.iter().enumerate() {
            if edge.is_point() {
                issues.push(OutlineIssue::ZeroLengthSegment {
                    contour: contour_ix,
                    at: edge.from,
                });
                continue;
            }
            if edge.is_flat() {
                issues.push(OutlineIssue::FlatCurve {
                    contour: contour_ix,
                    at: edge.to(),
                });
            }
            if is_redundant(edge, &edges[(i + 1) % edges.len()]) {
                issues.push(OutlineIssue::RedundantPoint {
                    contour: contour_ix,
                    at: edge.to(),
                });
            }
        }
        let area = contour.signed_area().abs();
        if area < min_area as f64 {
            tiny[contour_ix] = true;
            issues.push(OutlineIssue::TinyContour {
                contour: contour_ix,
                area,
            });
        }
    }

    let simplified = simplifier.simplify(outline, winding)?;
    let mut remaining: Vec<_> = simplified.contours().iter().map(contour_key).collect();
    let mut take = |contour: &Contour| {
        let key = contour_key(contour);
        let found = remaining.iter().position(|k| *k == key);
        found.map(|ix| remaining.swap_remove(ix))
    };
    for (contour_ix, contour) in outline.contours().iter().enumerate() {
        if tiny[contour_ix] {
            continue;
        }
        if take(contour).is_some() {
            continue;
        }
        match take(&contour.reversed()) {
            Some(_) => issues.push(OutlineIssue::WrongDirection {
                contour: contour_ix,
            }),
            None => issues.push(OutlineIssue::Overlap {
                contour: contour_ix,
            }),
        }
    }
    Ok(issues)
}

/// Remove zero-length segments and redundant points, and turn flat curves
/// into lines.
///
/// Contours left without any edge are dropped.
pub fn clean_outline(outline: &GlyphOutline) -> GlyphOutline {
    outline.contours().iter().filter_map(clean_contour).collect()
}

fn clean_contour(contour: &Contour) -> Option<Contour> {
    let mut edges: Vec<Edge> = edges(contour)
        .into_iter()
        .filter(|edge| !edge.is_point())
        .map(|edge| match edge.is_flat() {
            true => Edge {
                from: edge.from,
                segment: Segment::LineTo(edge.to()),
            },
            false => edge,
        })
        .collect();
    let mut i = 0;
    while edges.len() > 2 && i < edges.len() {
        let next = (i + 1) % edges.len();
        if !is_redundant(&edges[i], &edges[next]) {
            i += 1;
            continue;
        }
        edges[i].segment = Segment::LineTo(edges[next].to());
        edges.remove(next);
        if next == 0 {
            // the merged edge moved down with the rest
            i -= 1;
        }
    }
    let start = edges.first()?.from;
    Some(Contour::new(start, edges.iter().map(|edge| edge.segment)))
}

impl OutlineFont {
    /// Report the defects of every glyph, without changing the font.
    ///
    /// `glyf` composites are only checked for overlapping components.
    /// Glyphs without issues are left out of the result.
    pub fn check_outlines<S: PathSimplifier + ?Sized>(
        &self,
        min_area: u32,
        simplifier: &S,
    ) -> Result<Vec<GlyphIssues>, Error> {
        let winding = self.format().winding();
        let mut found = Vec::new();
        for gid in (0..self.num_glyphs() as u32).map(GlyphId::new) {
            let glyph = self.display_name(gid);
            let issues = match self.is_composite(gid) {
                true => match components_overlap(self, gid, simplifier)? {
                    true => vec![OutlineIssue::OverlappingComponents],
                    false => Vec::new(),
                },
                false => {
                    let outline = self.outline(gid, false)?;
                    find_issues(&outline, winding, min_area, simplifier).map_err(|source| {
                        Error::Geometry {
                            glyph: glyph.clone(),
                            source,
                        }
                    })?
                }
            };
            if !issues.is_empty() {
                log::debug!("'{glyph}' has {} issues", issues.len());
                found.push(GlyphIssues { glyph, issues });
            }
        }
        log::info!("{} glyphs have outline issues", found.len());
        Ok(found)
    }

    /// Apply [`clean_outline`] to every simple glyph.
    pub fn clean_outlines(&mut self, policy: BatchPolicy) -> Result<BatchReport, BatchError> {
        let order: Vec<_> = (0..self.num_glyphs() as u32).map(GlyphId::new).collect();
        let report = run_batch(self, &order, policy, |font, gid| {
            if font.is_composite(gid) {
                return Ok(None);
            }
            let outline = font.outline(gid, false)?;
            let cleaned = clean_outline(&outline);
            Ok((!same_outline(&cleaned, &outline)).then_some(cleaned))
        })?;
        log::info!("cleaned {} glyphs", report.modified().len());
        Ok(report)
    }

    /// Fix what [`OutlineFont::check_outlines`] reports: clean every outline,
    /// then run contour correction.
    pub fn fix_outlines<S: PathSimplifier + ?Sized>(
        &mut self,
        options: &ContourOptions,
        simplifier: &S,
    ) -> Result<BatchReport, BatchError> {
        let policy = BatchPolicy {
            ignore_errors: options.ignore_errors,
        };
        let mut report = self.clean_outlines(policy)?;
        let corrected = match self.correct_contours(options, simplifier) {
            Ok(corrected) => corrected,
            Err(mut err) => {
                let mut modified = report.into_modified();
                modified.extend(err.modified);
                err.modified = modified;
                return Err(err);
            }
        };
        report.merge(corrected);
        if options.remove_hinting && report.needs_save() {
            self.remove_hinting();
        }
        Ok(report)
    }
}
