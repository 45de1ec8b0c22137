//! The in-memory font model.

mod basis;
mod build;
mod commit;
mod extract;

use std::collections::HashMap;

use skrifa::instance::{LocationRef, Size};
use skrifa::outline::DrawSettings;
use skrifa::{GlyphId, GlyphNames, MetadataProvider};
use write_fonts::from_obj::FromTableRef;
use write_fonts::read::{FontRef, TableProvider};
use write_fonts::tables::glyf::{CompositeGlyph, Glyph};

use crate::cff::{CffError, CffFontInfo, CffOutlines};
use crate::outline::{GlyphOutline, OutlineBuilder, OutlineFormat};
use crate::Error;

#[cfg(test)]
pub(crate) use build::mark_as_cff;
pub use extract::ComponentRef;

/// Glyph outlines in the representation of their table.
#[derive(Clone, Debug)]
pub enum Outlines {
    /// One entry per glyph of a `glyf` table.
    Glyf(Vec<Glyph>),
    Cff(CffOutlines),
}

impl Outlines {
    pub fn format(&self) -> OutlineFormat {
        match self {
            Outlines::Glyf(_) => OutlineFormat::TrueType,
            Outlines::Cff(_) => OutlineFormat::PostScript,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Outlines::Glyf(glyphs) => glyphs.len(),
            Outlines::Cff(cff) => cff.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Horizontal metrics of one glyph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub advance: u16,
    pub lsb: i16,
}

/// The change in left side bearing caused by writing an outline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsDelta {
    pub old_lsb: i16,
    pub new_lsb: i16,
}

impl MetricsDelta {
    pub fn is_changed(&self) -> bool {
        self.old_lsb != self.new_lsb
    }
}

/// The outlines and horizontal metrics of a font, with its glyph order.
///
/// Other tables are not loaded; [`OutlineFont::build`] copies them from
/// the source font.
#[derive(Clone, Debug)]
pub struct OutlineFont {
    units_per_em: u16,
    glyph_names: Vec<String>,
    glyph_ids: HashMap<String, GlyphId>,
    outlines: Outlines,
    metrics: Vec<Metrics>,
    source_format: OutlineFormat,
    /// Top and private dictionary data used when writing a `CFF ` table
    /// for a font whose outlines are currently stored as `glyf`.
    postscript_info: Option<CffFontInfo>,
    drop_hinting: bool,
}

impl OutlineFont {
    /// Load the outlines of a TrueType or CFF flavored font.
    pub fn new(data: &[u8]) -> Result<Self, Error> {
        let font = FontRef::new(data)?;
        let units_per_em = font.head()?.units_per_em();
        let num_glyphs = font.maxp()?.num_glyphs();
        let hmtx = font.hmtx()?;
        let metrics = (0..num_glyphs as u32)
            .map(GlyphId::new)
            .map(|gid| Metrics {
                advance: hmtx.advance(gid).unwrap_or_default(),
                lsb: hmtx.side_bearing(gid).unwrap_or_default(),
            })
            .collect::<Vec<_>>();
        let glyph_names = unique_glyph_names(&font, num_glyphs);
        let glyph_ids = glyph_names
            .iter()
            .enumerate()
            .map(|(gid, name)| (name.clone(), GlyphId::new(gid as u32)))
            .collect();

        let (outlines, postscript_info) = if let Ok(glyf) = font.glyf() {
            let loca = font.loca(None)?;
            let glyphs = (0..num_glyphs as u32)
                .map(|gid| {
                    Ok(match loca.get_glyf(GlyphId::new(gid), &glyf)? {
                        Some(glyph) => Glyph::from_table_ref(&glyph),
                        None => Glyph::Empty,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?;
            (Outlines::Glyf(glyphs), Some(CffFontInfo::synthesize(&font)))
        } else if let Ok(cff) = font.cff() {
            let info = CffFontInfo::read(&cff).map_err(|error| match error {
                CffError::CidKeyed => Error::Unsupported("CID-keyed CFF fonts".into()),
                error => error.into(),
            })?;
            let outlines = draw_all(&font, num_glyphs)?;
            let advances: Vec<_> = metrics.iter().map(|m| m.advance).collect();
            (Outlines::Cff(CffOutlines::new(info, &outlines, &advances)?), None)
        } else if font.cff2().is_ok() {
            return Err(Error::Unsupported("CFF2 outlines".into()));
        } else {
            return Err(Error::Unsupported("font has no glyf or CFF table".into()));
        };

        let source_format = outlines.format();
        log::debug!(
            "loaded {num_glyphs} glyphs with {source_format:?} outlines, {units_per_em} units per em"
        );
        Ok(Self {
            units_per_em,
            glyph_names,
            glyph_ids,
            outlines,
            metrics,
            source_format,
            postscript_info,
            drop_hinting: false,
        })
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyph_names.len()
    }

    /// The current outline format; it changes after a curve conversion.
    pub fn format(&self) -> OutlineFormat {
        self.outlines.format()
    }

    /// The outline format of the font this model was loaded from.
    pub fn source_format(&self) -> OutlineFormat {
        self.source_format
    }

    pub fn outlines(&self) -> &Outlines {
        &self.outlines
    }

    pub fn glyph_names(&self) -> &[String] {
        &self.glyph_names
    }

    /// The name of a glyph, or `None` if the id is out of range.
    pub fn glyph_name(&self, gid: GlyphId) -> Option<&str> {
        self.glyph_names
            .get(gid.to_u32() as usize)
            .map(String::as_str)
    }

    pub fn glyph_id(&self, name: &str) -> Result<GlyphId, Error> {
        self.glyph_ids
            .get(name)
            .copied()
            .ok_or_else(|| Error::GlyphNotFound(name.to_owned()))
    }

    pub fn metrics(&self, gid: GlyphId) -> Option<Metrics> {
        self.metrics.get(gid.to_u32() as usize).copied()
    }

    /// `true` once hinting has been removed; hinting tables are then left
    /// out by [`OutlineFont::build`].
    pub fn drops_hinting(&self) -> bool {
        self.drop_hinting
    }

    /// Strip TrueType instructions from every glyph.
    ///
    /// `fpgm`, `prep`, `cvt `, `hdmx`, `LTSH` and `VDMX` are dropped when the
    /// font is built.
    pub fn remove_hinting(&mut self) {
        self.drop_hinting = true;
        if let Outlines::Glyf(glyphs) = &mut self.outlines {
            for glyph in glyphs.iter_mut() {
                match glyph {
                    Glyph::Simple(simple) => simple.instructions.clear(),
                    Glyph::Composite(composite) => *composite = without_instructions(composite),
                    Glyph::Empty => (),
                }
            }
        }
    }

    /// The name used in log messages and errors for a glyph id.
    pub(crate) fn display_name(&self, gid: GlyphId) -> String {
        self.glyph_name(gid)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("gid{}", gid.to_u32()))
    }

    pub(crate) fn check_gid(&self, gid: GlyphId) -> Result<usize, Error> {
        let ix = gid.to_u32() as usize;
        if ix < self.glyph_names.len() {
            Ok(ix)
        } else {
            Err(Error::GlyphNotFound(format!("gid{}", gid.to_u32())))
        }
    }

    /// Replace the outline storage, keeping the CFF font info around for a
    /// later conversion back.
    pub(crate) fn replace_outlines(&mut self, outlines: Outlines) {
        if let Outlines::Cff(cff) = &self.outlines {
            self.postscript_info = Some(cff.info().clone());
        }
        self.outlines = outlines;
    }

    pub(crate) fn postscript_info(&self) -> CffFontInfo {
        self.postscript_info.clone().unwrap_or_default()
    }

    pub(crate) fn set_lsb(&mut self, ix: usize, lsb: i16) {
        if let Some(metrics) = self.metrics.get_mut(ix) {
            metrics.lsb = lsb;
        }
    }

    pub(crate) fn all_metrics(&self) -> &[Metrics] {
        &self.metrics
    }
}

/// The left side bearing of `outline`: the floor of its exact left edge, or
/// zero when it has no contours.
pub(crate) fn left_side_bearing(outline: &GlyphOutline, glyph: &str) -> Result<i16, Error> {
    let Some(bounds) = outline.bounds() else {
        return Ok(0);
    };
    to_font_unit(bounds.x0.floor()).ok_or_else(|| Error::MalformedPath {
        glyph: glyph.to_owned(),
        reason: format!("left edge {} does not fit a 16-bit coordinate", bounds.x0),
    })
}

/// `value` as an `i16`, if it is an integer in range.
pub(crate) fn to_font_unit(value: f64) -> Option<i16> {
    let in_range = (i16::MIN as f64..=i16::MAX as f64).contains(&value);
    (in_range && value.fract() == 0.0).then_some(value as i16)
}

/// Glyph names in glyph order, made unique by appending `#1`, `#2`, …
fn unique_glyph_names(font: &FontRef, num_glyphs: u16) -> Vec<String> {
    let names = GlyphNames::new(font);
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..num_glyphs as u32)
        .map(|gid| {
            let name = names
                .get(GlyphId::new(gid))
                .map(|name| name.as_str().to_owned())
                .unwrap_or_else(|| format!("gid{gid}"));
            let count = seen.entry(name.clone()).or_default();
            *count += 1;
            match *count {
                1 => name,
                n => {
                    log::warn!("duplicate glyph name '{name}' at gid {gid}");
                    format!("{name}#{}", n - 1)
                }
            }
        })
        .collect()
}

/// Draw every glyph with skrifa, which resolves subroutines and skips
/// hint operators.
fn draw_all(font: &FontRef, num_glyphs: u16) -> Result<Vec<GlyphOutline>, Error> {
    let glyphs = font.outline_glyphs();
    (0..num_glyphs as u32)
        .map(|gid| {
            let Some(glyph) = glyphs.get(GlyphId::new(gid)) else {
                return Ok(GlyphOutline::new());
            };
            let mut builder = OutlineBuilder::new();
            glyph
                .draw(
                    DrawSettings::unhinted(Size::unscaled(), LocationRef::default()),
                    &mut builder,
                )
                .map_err(|source| CffError::Draw { glyph: gid, source })?;
            Ok(builder.finish())
        })
        .collect()
}

/// A copy of a composite glyph without its instructions.
pub(crate) fn without_instructions(composite: &CompositeGlyph) -> CompositeGlyph {
    let bbox = composite.bbox;
    match CompositeGlyph::try_from_iter(
        composite
            .components()
            .iter()
            .map(|component| (component.clone(), bbox)),
    ) {
        Ok(mut stripped) => {
            stripped.bbox = bbox;
            stripped
        }
        Err(_) => composite.clone(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::{self, TestGlyph};

    #[test]
    fn loads_glyf_font() {
        let data = test_support::glyf_font(&[
            (".notdef", TestGlyph::empty()),
            ("A", TestGlyph::rect(10, 0, 110, 200)),
            ("B", TestGlyph::rect(0, 0, 50, 50)),
        ]);
        let font = OutlineFont::new(&data).unwrap();
        assert_eq!(font.units_per_em(), 1000);
        assert_eq!(font.num_glyphs(), 3);
        assert_eq!(font.format(), OutlineFormat::TrueType);
        assert_eq!(font.glyph_id("B").unwrap(), GlyphId::new(2));
        assert!(matches!(font.glyph_id("C"), Err(Error::GlyphNotFound(name)) if name == "C"));
        assert_eq!(
            font.metrics(GlyphId::new(1)),
            Some(Metrics {
                advance: 600,
                lsb: 10
            })
        );
    }

    #[test]
    fn loads_cff_font() {
        let data = test_support::cff_font(&[
            (".notdef", TestGlyph::empty()),
            ("A", TestGlyph::rect(10, 0, 110, 200)),
        ]);
        let font = OutlineFont::new(&data).unwrap();
        assert_eq!(font.format(), OutlineFormat::PostScript);
        assert_eq!(font.glyph_names(), [".notdef", "A"]);
        assert_eq!(font.glyph_id("A").unwrap(), GlyphId::new(1));
        let outline = font.outline(GlyphId::new(1), false).unwrap();
        assert_eq!(outline.bounds(), Some(kurbo::Rect::new(10.0, 0.0, 110.0, 200.0)));
        assert_eq!(
            font.metrics(GlyphId::new(1)),
            Some(Metrics {
                advance: 600,
                lsb: 10
            })
        );
    }

    #[test]
    fn hinting_is_stripped() {
        let data = test_support::glyf_font(&[
            (".notdef", TestGlyph::empty()),
            ("A", TestGlyph::rect(10, 0, 110, 200).with_instructions(&[0xb0, 0x01])),
        ]);
        let mut font = OutlineFont::new(&data).unwrap();
        let Outlines::Glyf(glyphs) = font.outlines() else {
            panic!("expected glyf outlines");
        };
        assert!(matches!(&glyphs[1], Glyph::Simple(simple) if !simple.instructions.is_empty()));
        font.remove_hinting();
        let Outlines::Glyf(glyphs) = font.outlines() else {
            panic!("expected glyf outlines");
        };
        assert!(matches!(&glyphs[1], Glyph::Simple(simple) if simple.instructions.is_empty()));
        assert!(font.drops_hinting());
    }
}
