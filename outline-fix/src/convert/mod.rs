//! Conversion between quadratic (`glyf`) and cubic (`CFF `) curves.
//!
//! Quadratic to cubic conversion runs a chain of [`ConversionStrategy`]
//! implementations and keeps the first result: [`Direct`] elevates and
//! merges the curves of each TrueType contour, and [`RoundTrip`] normalizes
//! the contour through an intermediate cubic form first, which resolves
//! the inputs [`Direct`] rejects.

mod cu2qu;
mod qu2cu;

use kurbo::QuadBez;

use crate::outline::{Contour, GlyphOutline, Segment};
use crate::quadratic::QuadraticContour;

pub use cu2qu::{contour_to_quadratic, cubic_to_quadratic};
pub use qu2cu::contour_to_cubic;

/// A reason a contour could not be converted.
///
/// `contour` is the index of the failing contour in its glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionError {
    /// Every point of the contour is off the curve.
    NoOnCurvePoints { contour: usize },
    /// Two consecutive off-curve points coincide.
    Degenerate { contour: usize },
    /// A cubic could not be approximated within the tolerance.
    Approximation { contour: usize },
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionError::NoOnCurvePoints { contour } => {
                write!(f, "contour {contour} has no on-curve points")
            }
            ConversionError::Degenerate { contour } => {
                write!(f, "contour {contour} has coincident off-curve points")
            }
            ConversionError::Approximation { contour } => {
                write!(f, "contour {contour} cannot be approximated within tolerance")
            }
        }
    }
}

impl std::error::Error for ConversionError {}

/// A way of turning TrueType contours into a cubic outline.
pub trait ConversionStrategy {
    fn name(&self) -> &'static str;

    /// Convert `contours`; no point of the result may deviate from the
    /// source curves by more than `tolerance` units.
    fn to_cubic(
        &self,
        contours: &[QuadraticContour],
        tolerance: f64,
    ) -> Result<GlyphOutline, ConversionError>;
}

/// Elevate each quadratic exactly and merge runs of cubics.
///
/// Output contours run in the opposite direction to their source.
#[derive(Clone, Copy, Debug, Default)]
pub struct Direct;

impl ConversionStrategy for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn to_cubic(
        &self,
        contours: &[QuadraticContour],
        tolerance: f64,
    ) -> Result<GlyphOutline, ConversionError> {
        let mut outline = GlyphOutline::new();
        for (ix, contour) in contours.iter().enumerate() {
            outline.push(contour_to_cubic(contour, tolerance, ix)?.reversed());
        }
        Ok(outline)
    }
}

/// Rebuild each contour with an explicit on-curve point at every segment
/// boundary, then run [`Direct`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundTrip;

impl ConversionStrategy for RoundTrip {
    fn name(&self) -> &'static str {
        "round trip"
    }

    fn to_cubic(
        &self,
        contours: &[QuadraticContour],
        tolerance: f64,
    ) -> Result<GlyphOutline, ConversionError> {
        let mut explicit = Vec::with_capacity(contours.len());
        for (ix, contour) in contours.iter().enumerate() {
            let cubic = elevate(&contour.to_contour());
            let quadratic = contour_to_quadratic(&cubic, tolerance)
                .and_then(|contour| QuadraticContour::from_contour(&contour))
                .ok_or(ConversionError::Approximation { contour: ix })?;
            explicit.push(quadratic);
        }
        Direct.to_cubic(&explicit, tolerance)
    }
}

const STRATEGIES: &[&dyn ConversionStrategy] = &[&Direct, &RoundTrip];

/// Convert TrueType contours to a cubic outline, trying each strategy in
/// turn.
///
/// If every strategy fails, the error of the last one is returned.
pub fn quadratic_to_cubic(
    contours: &[QuadraticContour],
    tolerance: f64,
) -> Result<GlyphOutline, ConversionError> {
    let mut last_error = None;
    for strategy in STRATEGIES {
        match strategy.to_cubic(contours, tolerance) {
            Ok(outline) => return Ok(outline),
            Err(error) => {
                log::debug!("{} conversion failed: {error}", strategy.name());
                last_error = Some(error);
            }
        }
    }
    Err(last_error.unwrap_or(ConversionError::Approximation { contour: 0 }))
}

/// Raise every quadratic segment of `contour` to an equivalent cubic.
fn elevate(contour: &Contour) -> Contour {
    let Some(start) = contour.start() else {
        return Contour::default();
    };
    let mut current = start;
    let segments = contour.drawing_segments().iter().map(|segment| {
        let raised = match *segment {
            Segment::QuadTo(c, p) => {
                let cubic = QuadBez::new(current, c, p).raise();
                Segment::CubicTo(cubic.p1, cubic.p2, cubic.p3)
            }
            other => other,
        };
        current = segment.end_point().unwrap_or(current);
        raised
    });
    Contour::new(start, segments.collect::<Vec<_>>())
}
