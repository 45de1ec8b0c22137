//! Converting a whole font between quadratic and cubic outlines.

use skrifa::GlyphId;
use write_fonts::tables::glyf::Glyph;

use super::{left_side_bearing, OutlineFont, Outlines};
use crate::batch::{BatchPolicy, BatchReport};
use crate::cff::{charstring, CffOutlines};
use crate::convert::{cubic_to_quadratic, quadratic_to_cubic};
use crate::normalize::{normalize, round_outline, same_outline};
use crate::outline::{GlyphOutline, OutlineFormat, Winding};
use crate::quadratic::QuadraticContour;
use crate::simplify::PathSimplifier;
use crate::{BatchError, ContourOptions, ConversionOptions, Error, ModifiedSet};

impl OutlineFont {
    /// Convert `glyf` outlines to CFF charstrings.
    ///
    /// Composites are decomposed. The font keeps its `glyf` outlines unless
    /// every glyph converts, or failures are ignored; a glyph that fails
    /// under `ignore_errors` is written without contours.
    pub fn to_cubic<S: PathSimplifier + ?Sized>(
        &mut self,
        options: &ConversionOptions,
        simplifier: &S,
    ) -> Result<BatchReport, BatchError> {
        self.expect_format(OutlineFormat::TrueType)?;
        let tolerance = options.tolerance_in_units(self.units_per_em());
        let policy = BatchPolicy {
            ignore_errors: options.ignore_errors,
        };
        log::info!(
            "converting {} glyphs to cubic curves, tolerance {tolerance} units",
            self.num_glyphs()
        );
        let mut report = BatchReport::new(self.glyph_names().iter().map(String::as_str));
        let mut outlines = Vec::with_capacity(self.num_glyphs());
        let mut lsbs = Vec::with_capacity(self.num_glyphs());
        for gid in (0..self.num_glyphs() as u32).map(GlyphId::new) {
            let name = self.display_name(gid);
            report.start(&name);
            match self.cubic_outline(gid, tolerance, options, simplifier) {
                Ok((outline, lsb)) => {
                    outlines.push(outline);
                    lsbs.push(lsb);
                    report.commit(&name);
                }
                Err(error) => {
                    report.fail(&name, error, policy)?;
                    outlines.push(GlyphOutline::new());
                    lsbs.push(0);
                }
            }
        }

        let advances: Vec<u16> = self.all_metrics().iter().map(|m| m.advance).collect();
        let cff = CffOutlines::new(self.postscript_info(), &outlines, &advances)
            .map_err(|error| BatchError::new(error.into(), ModifiedSet::new()))?;
        self.replace_outlines(Outlines::Cff(cff));
        for (ix, lsb) in lsbs.into_iter().enumerate() {
            self.set_lsb(ix, lsb);
        }
        Ok(report)
    }

    /// Convert CFF charstrings to `glyf` outlines.
    ///
    /// The font keeps its CFF outlines unless every glyph converts, or
    /// failures are ignored; a glyph that fails under `ignore_errors` is
    /// written without contours.
    pub fn to_quadratic<S: PathSimplifier + ?Sized>(
        &mut self,
        options: &ConversionOptions,
        simplifier: &S,
    ) -> Result<BatchReport, BatchError> {
        self.expect_format(OutlineFormat::PostScript)?;
        let tolerance = options.tolerance_in_units(self.units_per_em());
        let policy = BatchPolicy {
            ignore_errors: options.ignore_errors,
        };
        log::info!(
            "converting {} glyphs to quadratic curves, tolerance {tolerance} units",
            self.num_glyphs()
        );
        let mut report = BatchReport::new(self.glyph_names().iter().map(String::as_str));
        let mut streams = Vec::with_capacity(self.num_glyphs());
        for gid in (0..self.num_glyphs() as u32).map(GlyphId::new) {
            let name = self.display_name(gid);
            report.start(&name);
            match self.quadratic_outline(gid, tolerance, options, simplifier) {
                Ok(contours) => {
                    streams.push(contours);
                    report.commit(&name);
                }
                Err(error) => {
                    report.fail(&name, error, policy)?;
                    streams.push(Vec::new());
                }
            }
        }

        self.replace_outlines(Outlines::Glyf(vec![Glyph::Empty; self.num_glyphs()]));
        for (gid, contours) in streams.iter().enumerate() {
            self.commit_quadratic(GlyphId::new(gid as u32), contours)
                .map_err(|error| BatchError::new(error, ModifiedSet::new()))?;
        }
        Ok(report)
    }

    fn expect_format(&self, format: OutlineFormat) -> Result<(), BatchError> {
        if self.format() == format {
            return Ok(());
        }
        let error = Error::Unsupported(format!("font outlines are already {:?}", self.format()));
        Err(BatchError::new(error, ModifiedSet::new()))
    }

    fn cubic_outline<S: PathSimplifier + ?Sized>(
        &self,
        gid: GlyphId,
        tolerance: f64,
        options: &ConversionOptions,
        simplifier: &S,
    ) -> Result<(GlyphOutline, i16), Error> {
        let contours = self.quadratic_contours(gid)?;
        let cubic = quadratic_to_cubic(&contours, tolerance).map_err(|source| Error::Conversion {
            glyph: self.display_name(gid),
            source,
        })?;
        let cubic = match options.correct_contours && !cubic.is_empty() {
            true => normalize(
                &cubic,
                Winding::CounterClockwise,
                ContourOptions::default().min_area,
                simplifier,
                &self.display_name(gid),
            )?,
            false => cubic,
        };
        let rounded = round_outline(&cubic);
        let name = self.display_name(gid);
        charstring::encode(&rounded, None).map_err(|source| Error::MalformedPath {
            glyph: name.clone(),
            reason: source.to_string(),
        })?;
        let lsb = left_side_bearing(&rounded, &name)?;
        Ok((rounded, lsb))
    }

    fn quadratic_outline<S: PathSimplifier + ?Sized>(
        &self,
        gid: GlyphId,
        tolerance: f64,
        options: &ConversionOptions,
        simplifier: &S,
    ) -> Result<Vec<QuadraticContour>, Error> {
        let name = self.display_name(gid);
        let outline = self.outline(gid, true)?;
        let contours = cubic_to_quadratic(&outline, tolerance).map_err(|source| {
            Error::Conversion {
                glyph: name.clone(),
                source,
            }
        })?;
        if !options.correct_contours || contours.is_empty() {
            return Ok(contours);
        }
        let quadratic: GlyphOutline = contours.iter().map(QuadraticContour::to_contour).collect();
        let corrected = normalize(
            &quadratic,
            Winding::Clockwise,
            ContourOptions::default().min_area,
            simplifier,
            &name,
        )?;
        if same_outline(&corrected, &quadratic) {
            return Ok(contours);
        }
        corrected
            .contours()
            .iter()
            .map(|contour| {
                QuadraticContour::from_contour(contour).ok_or_else(|| Error::MalformedPath {
                    glyph: name.clone(),
                    reason: "contour correction produced cubic curves".into(),
                })
            })
            .collect()
    }
}
