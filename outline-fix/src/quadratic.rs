//! TrueType point streams.
//!
//! In a `glyf` contour two consecutive off-curve points imply an on-curve
//! point at their midpoint. [`QuadraticContour`] keeps the points exactly
//! as stored so that explicit and implied on-curve points can be told apart.

use kurbo::Point;
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::tables::glyf::Contour as GlyfContour;
use write_fonts::OtRound;

use crate::outline::{Contour, Segment};

/// A single point of a TrueType contour.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContourPoint {
    pub point: Point,
    pub on_curve: bool,
}

impl ContourPoint {
    pub fn on(point: Point) -> Self {
        Self {
            point,
            on_curve: true,
        }
    }

    pub fn off(point: Point) -> Self {
        Self {
            point,
            on_curve: false,
        }
    }
}

/// A closed contour made of line and quadratic segments, as a point stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadraticContour {
    points: Vec<ContourPoint>,
}

impl QuadraticContour {
    pub fn new(points: Vec<ContourPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ContourPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `true` if at least one point is explicitly on the curve.
    pub fn has_on_curve_point(&self) -> bool {
        self.points.iter().any(|p| p.on_curve)
    }

    pub fn map_points(&self, mut f: impl FnMut(Point) -> Point) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| ContourPoint {
                    point: f(p.point),
                    on_curve: p.on_curve,
                })
                .collect(),
        }
    }

    /// Expand the point stream into segments, materializing implied
    /// on-curve points.
    ///
    /// A contour that begins with an off-curve point starts at its last
    /// point when that one is on the curve, otherwise at the midpoint of the
    /// last and first points.
    pub fn to_contour(&self) -> Contour {
        let points = &self.points;
        let Some(first) = points.first() else {
            return Contour::default();
        };
        let (start, rest): (Point, Vec<ContourPoint>) = if first.on_curve {
            (first.point, points[1..].to_vec())
        } else {
            match points.last() {
                Some(last) if last.on_curve => {
                    (last.point, points[..points.len() - 1].to_vec())
                }
                Some(last) => (last.point.midpoint(first.point), points.to_vec()),
                None => return Contour::default(),
            }
        };
        let mut segments = Vec::with_capacity(rest.len());
        let mut pending: Option<Point> = None;
        for pt in rest.iter().chain(std::iter::once(&ContourPoint::on(start))) {
            match (pending.take(), pt.on_curve) {
                (None, true) => segments.push(Segment::LineTo(pt.point)),
                (None, false) => pending = Some(pt.point),
                (Some(ctrl), true) => segments.push(Segment::QuadTo(ctrl, pt.point)),
                (Some(ctrl), false) => {
                    segments.push(Segment::QuadTo(ctrl, ctrl.midpoint(pt.point)));
                    pending = Some(pt.point);
                }
            }
        }
        Contour::new(start, segments)
    }

    /// Build a point stream from a contour of lines and quadratic curves,
    /// with an explicit on-curve point at every segment boundary.
    ///
    /// Returns `None` if the contour contains cubic segments.
    pub fn from_contour(contour: &Contour) -> Option<Self> {
        let start = contour.start()?;
        let mut points = vec![ContourPoint::on(start)];
        for segment in contour.drawing_segments() {
            match *segment {
                Segment::LineTo(p) => points.push(ContourPoint::on(p)),
                Segment::QuadTo(c, p) => {
                    points.push(ContourPoint::off(c));
                    points.push(ContourPoint::on(p));
                }
                Segment::CubicTo(..) => return None,
                Segment::MoveTo(_) | Segment::Close => (),
            }
        }
        // the closing point duplicates the start
        if points.len() > 1 && points.last() == Some(&ContourPoint::on(start)) {
            points.pop();
        }
        Some(Self { points })
    }

    /// Convert to a `glyf` contour, rounding coordinates.
    pub fn to_glyf_contour(&self) -> GlyfContour {
        self.points
            .iter()
            .map(|p| CurvePoint::new(p.point.x.ot_round(), p.point.y.ot_round(), p.on_curve))
            .collect::<Vec<_>>()
            .into()
    }

    pub fn from_glyf_contour(contour: &GlyfContour) -> Self {
        Self {
            points: contour
                .iter()
                .map(|p| ContourPoint {
                    point: Point::new(p.x as f64, p.y as f64),
                    on_curve: p.on_curve,
                })
                .collect(),
        }
    }
}
