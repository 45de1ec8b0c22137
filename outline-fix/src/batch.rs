//! Running an operation over many glyphs of a font.

use indexmap::IndexMap;
use skrifa::GlyphId;

use crate::font::OutlineFont;
use crate::normalize::{normalize, round_outline, same_outline};
use crate::outline::{GlyphOutline, OutlineFormat};
use crate::overlap::components_overlap;
use crate::simplify::PathSimplifier;
use crate::{BatchError, ContourOptions, Error, ModifiedSet};

/// Where a glyph is in a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlyphState {
    Pending,
    Processing,
    /// A new outline was written.
    Committed,
    /// Processing finished without a change.
    Skipped,
    /// Processing failed and the error was ignored.
    Failed,
}

/// How a batch reacts to failing glyphs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Record failures and continue instead of stopping at the first one.
    pub ignore_errors: bool,
}

/// The outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    states: IndexMap<String, GlyphState>,
    modified: ModifiedSet,
    failed: Vec<(String, Error)>,
}

impl BatchReport {
    pub(crate) fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            states: names
                .into_iter()
                .map(|name| (name.to_owned(), GlyphState::Pending))
                .collect(),
            ..Default::default()
        }
    }

    /// The glyphs that received a new outline, in processing order.
    pub fn modified(&self) -> &ModifiedSet {
        &self.modified
    }

    pub fn into_modified(self) -> ModifiedSet {
        self.modified
    }

    /// `true` if any glyph changed, so the font should be written out.
    pub fn needs_save(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn state(&self, glyph: &str) -> Option<GlyphState> {
        self.states.get(glyph).copied()
    }

    /// Glyphs that were processed without a change.
    pub fn skipped(&self) -> impl Iterator<Item = &str> + '_ {
        self.states
            .iter()
            .filter(|(_, state)| **state == GlyphState::Skipped)
            .map(|(name, _)| name.as_str())
    }

    /// Glyphs whose processing failed, with their errors.
    pub fn failed(&self) -> &[(String, Error)] {
        &self.failed
    }

    /// Fold in the report of a later pass over the same font.
    ///
    /// A glyph committed by either pass stays committed.
    pub(crate) fn merge(&mut self, later: BatchReport) {
        for (name, state) in later.states {
            let state = match (self.states.get(&name), state) {
                (Some(GlyphState::Committed), GlyphState::Skipped | GlyphState::Pending) => {
                    GlyphState::Committed
                }
                (_, state) => state,
            };
            self.states.insert(name, state);
        }
        self.modified.extend(later.modified);
        self.failed.extend(later.failed);
    }

    pub(crate) fn start(&mut self, glyph: &str) {
        self.states.insert(glyph.to_owned(), GlyphState::Processing);
    }

    pub(crate) fn commit(&mut self, glyph: &str) {
        self.states.insert(glyph.to_owned(), GlyphState::Committed);
        self.modified.insert(glyph.to_owned());
    }

    pub(crate) fn skip(&mut self, glyph: &str) {
        self.states.insert(glyph.to_owned(), GlyphState::Skipped);
    }

    /// Record a failure, or turn it into the batch error if it may not be
    /// ignored.
    pub(crate) fn fail(
        &mut self,
        glyph: &str,
        error: Error,
        policy: BatchPolicy,
    ) -> Result<(), BatchError> {
        if error.is_fatal() || !policy.ignore_errors {
            return Err(BatchError::new(error, std::mem::take(&mut self.modified)));
        }
        log::warn!("skipping '{glyph}': {error}");
        self.states.insert(glyph.to_owned(), GlyphState::Failed);
        self.failed.push((glyph.to_owned(), error));
        Ok(())
    }
}

/// Run `process` on each glyph of `order` and commit the outlines it
/// returns.
///
/// `process` returns `None` when a glyph needs no change. A failing glyph
/// keeps its outline; unless `policy` ignores errors the batch stops there,
/// and the glyphs committed so far are reported in the [`BatchError`].
/// [`Error::is_fatal`] errors always stop the batch.
pub fn run_batch<F>(
    font: &mut OutlineFont,
    order: &[GlyphId],
    policy: BatchPolicy,
    mut process: F,
) -> Result<BatchReport, BatchError>
where
    F: FnMut(&OutlineFont, GlyphId) -> Result<Option<GlyphOutline>, Error>,
{
    let names: Vec<String> = order.iter().map(|gid| font.display_name(*gid)).collect();
    let mut report = BatchReport::new(names.iter().map(String::as_str));
    for (gid, name) in order.iter().copied().zip(&names) {
        report.start(name);
        let result = process(&*font, gid).and_then(|outline| match outline {
            Some(outline) => font.commit(gid, &outline).map(|_| true),
            None => Ok(false),
        });
        match result {
            Ok(true) => {
                log::debug!("committed '{name}'");
                report.commit(name);
            }
            Ok(false) => report.skip(name),
            Err(error) => report.fail(name, error, policy)?,
        }
    }
    Ok(report)
}

impl OutlineFont {
    /// Glyph ids ordered so that components are processed before the
    /// composites that use them: simple and empty glyphs first, then
    /// composites by nesting depth and name.
    pub fn processing_order(&self) -> Result<Vec<GlyphId>, Error> {
        let gids = (0..self.num_glyphs() as u32).map(GlyphId::new);
        let mut order: Vec<GlyphId> = gids
            .clone()
            .filter(|gid| !self.is_composite(*gid))
            .collect();
        let mut composites = gids
            .filter(|gid| self.is_composite(*gid))
            .map(|gid| Ok((self.component_depth(gid)?, self.display_name(gid), gid)))
            .collect::<Result<Vec<_>, Error>>()?;
        composites.sort();
        order.extend(composites.into_iter().map(|(_, _, gid)| gid));
        Ok(order)
    }

    /// Remove overlaps, fix contour direction and drop tiny contours.
    ///
    /// For `glyf` fonts, simple glyphs with contours and composites whose
    /// components overlap are processed; a changed composite is replaced by
    /// a simple glyph. Every glyph of a CFF font is processed.
    pub fn correct_contours<S: PathSimplifier + ?Sized>(
        &mut self,
        options: &ContourOptions,
        simplifier: &S,
    ) -> Result<BatchReport, BatchError> {
        let policy = BatchPolicy {
            ignore_errors: options.ignore_errors,
        };
        let format = self.format();
        let order = match format {
            OutlineFormat::TrueType => self
                .processing_order()
                .map_err(|error| BatchError::new(error, ModifiedSet::new()))?,
            OutlineFormat::PostScript => {
                (0..self.num_glyphs() as u32).map(GlyphId::new).collect()
            }
        };
        log::info!("correcting contours of {} glyphs", order.len());
        let report = run_batch(self, &order, policy, |font, gid| {
            if font.is_composite(gid) && !components_overlap(font, gid, simplifier)? {
                return Ok(None);
            }
            let outline = font.outline(gid, true)?;
            if outline.is_empty() {
                return Ok(None);
            }
            let name = font.display_name(gid);
            let corrected = normalize(
                &outline,
                format.winding(),
                options.min_area,
                simplifier,
                &name,
            )?;
            Ok((!same_outline(&corrected, &outline)).then_some(corrected))
        })?;
        log::info!("{} glyphs modified", report.modified().len());
        if options.remove_hinting && report.needs_save() {
            self.remove_hinting();
        }
        Ok(report)
    }

    /// Replace every `glyf` composite with a simple glyph drawing the same
    /// contours.
    ///
    /// Implied on-curve points of the components stay implied. A CFF font
    /// has no composites and is left unchanged.
    pub fn decompose_composites(&mut self) -> Result<ModifiedSet, Error> {
        let mut modified = ModifiedSet::new();
        if self.format() != OutlineFormat::TrueType {
            return Ok(modified);
        }
        for gid in self.processing_order()? {
            if !self.is_composite(gid) {
                continue;
            }
            let contours = self.quadratic_contours(gid)?;
            self.commit_quadratic(gid, &contours)?;
            modified.insert(self.display_name(gid));
        }
        log::info!("decomposed {} composite glyphs", modified.len());
        Ok(modified)
    }

    /// Round every coordinate to an integer.
    ///
    /// Only CFF outlines can hold fractional coordinates, so for `glyf` fonts
    /// this never changes anything.
    pub fn round_coordinates(&mut self) -> Result<ModifiedSet, Error> {
        let mut modified = ModifiedSet::new();
        for gid in (0..self.num_glyphs() as u32).map(GlyphId::new) {
            let outline = self.outline(gid, false)?;
            let rounded = round_outline(&outline);
            if rounded != outline {
                self.commit(gid, &rounded)?;
                modified.insert(self.display_name(gid));
            }
        }
        Ok(modified)
    }
}
