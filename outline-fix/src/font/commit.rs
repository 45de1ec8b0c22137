//! Writing outlines back into the font model.

use skrifa::GlyphId;
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::tables::glyf::{Contour as GlyfContour, SimpleGlyph};

use super::{left_side_bearing, to_font_unit, MetricsDelta, OutlineFont, Outlines};
use crate::convert::contour_to_quadratic;
use crate::outline::GlyphOutline;
use crate::quadratic::QuadraticContour;
use crate::Error;

/// Tolerance, in font units, for approximating cubics written to `glyf`.
const GLYF_CUBIC_TOLERANCE: f64 = 1.0;

impl OutlineFont {
    /// Replace the outline of a glyph and bring its left side bearing in
    /// line with the new bounds.
    ///
    /// A `glyf` composite becomes a simple glyph. Cubic curves written to a
    /// `glyf` glyph are approximated with quadratics first.
    pub fn commit(&mut self, gid: GlyphId, outline: &GlyphOutline) -> Result<MetricsDelta, Error> {
        let ix = self.check_gid(gid)?;
        let name = self.display_name(gid);
        let new_lsb = match &mut self.outlines {
            Outlines::Glyf(_) => {
                let contours = outline
                    .contours()
                    .iter()
                    .map(|contour| {
                        let contour = match contour.has_cubics() {
                            true => contour_to_quadratic(contour, GLYF_CUBIC_TOLERANCE).ok_or_else(
                                || Error::MalformedPath {
                                    glyph: name.clone(),
                                    reason: "cubic curve cannot be approximated".into(),
                                },
                            )?,
                            false => contour.clone(),
                        };
                        QuadraticContour::from_contour(&contour).ok_or_else(|| {
                            Error::MalformedPath {
                                glyph: name.clone(),
                                reason: "contour has cubic segments".into(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                return self.commit_quadratic(gid, &contours);
            }
            Outlines::Cff(cff) => {
                let advance = self.metrics.get(ix).map(|m| m.advance).unwrap_or_default();
                let lsb = left_side_bearing(outline, &name)?;
                cff.set_outline(ix, outline, advance)?;
                lsb
            }
        };
        Ok(self.update_lsb(ix, &name, new_lsb))
    }

    /// Write TrueType point streams to a `glyf` glyph, rounding coordinates.
    ///
    /// On-curve points that lie exactly halfway between two off-curve
    /// points are left implied.
    pub(crate) fn commit_quadratic(
        &mut self,
        gid: GlyphId,
        contours: &[QuadraticContour],
    ) -> Result<MetricsDelta, Error> {
        let ix = self.check_gid(gid)?;
        let name = self.display_name(gid);
        let Outlines::Glyf(glyphs) = &mut self.outlines else {
            return Err(Error::Unsupported(format!(
                "glyph '{name}' has no quadratic outline"
            )));
        };
        let out_of_range = contours
            .iter()
            .flat_map(QuadraticContour::points)
            .find(|p| [p.point.x, p.point.y].iter().any(|v| to_font_unit(v.round()).is_none()));
        if let Some(p) = out_of_range {
            return Err(Error::MalformedPath {
                glyph: name,
                reason: format!("point {:?} does not fit 16-bit coordinates", p.point),
            });
        }
        let mut simple = SimpleGlyph {
            contours: contours
                .iter()
                .filter(|contour| !contour.is_empty())
                .map(|contour| drop_implied_points(contour.to_glyf_contour()))
                .collect(),
            ..Default::default()
        };
        simple.recompute_bounding_box();
        let new_lsb = match simple.contours.is_empty() {
            true => 0,
            false => simple.bbox.x_min,
        };
        glyphs[ix] = simple.into();
        Ok(self.update_lsb(ix, &name, new_lsb))
    }

    fn update_lsb(&mut self, ix: usize, name: &str, new_lsb: i16) -> MetricsDelta {
        let old_lsb = self.metrics.get(ix).map(|m| m.lsb).unwrap_or_default();
        if old_lsb != new_lsb {
            log::debug!("'{name}': left side bearing {old_lsb} -> {new_lsb}");
            self.set_lsb(ix, new_lsb);
        }
        MetricsDelta { old_lsb, new_lsb }
    }
}

fn drop_implied_points(contour: GlyfContour) -> GlyfContour {
    let points: Vec<CurvePoint> = contour.into();
    let len = points.len();
    let kept: Vec<CurvePoint> = points
        .iter()
        .enumerate()
        .filter(|&(i, point)| {
            // the first point stays so the contour keeps its start
            if i == 0 || !point.on_curve || len < 3 {
                return true;
            }
            let prev = points[i - 1];
            let next = points[(i + 1) % len];
            let implied = !prev.on_curve
                && !next.on_curve
                && prev.x as i32 + next.x as i32 == 2 * point.x as i32
                && prev.y as i32 + next.y as i32 == 2 * point.y as i32;
            !implied
        })
        .map(|(_, point)| *point)
        .collect();
    kept.into()
}
