//! PostScript outlines stored as `CFF ` charstrings.
//!
//! Charstrings are kept without subroutines or hints: glyphs loaded from a
//! font are drawn with skrifa, which resolves both, and re-encoded.

pub mod charstring;
mod dict;
mod table;

use std::collections::HashMap;

use skrifa::outline::DrawError;
use write_fonts::read::tables::postscript::Error as PostScriptError;
use write_fonts::read::ReadError;

use crate::outline::GlyphOutline;

pub use table::CffFontInfo;
pub(crate) use table::{compile, CompileInput};

/// An error produced while reading or writing CFF data.
#[derive(Clone, Debug)]
pub enum CffError {
    PostScript(PostScriptError),
    Read(ReadError),
    /// skrifa could not draw a glyph of the source font.
    Draw { glyph: u32, source: DrawError },
    /// CID-keyed fonts are not supported.
    CidKeyed,
    /// A DICT contained a reserved byte.
    InvalidDictByte(u8),
    TruncatedDict,
    TruncatedCharstring,
    /// More glyph names than a string INDEX can address.
    TooManyStrings,
    /// A charstring operand does not fit a 16.16 number.
    OperandOutOfRange(f64),
}

impl std::fmt::Display for CffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CffError::PostScript(error) => write!(f, "{error}"),
            CffError::Read(error) => write!(f, "{error}"),
            CffError::Draw { glyph, source } => {
                write!(f, "failed to draw glyph {glyph}: {source}")
            }
            CffError::CidKeyed => write!(f, "CID-keyed fonts are not supported"),
            CffError::InvalidDictByte(byte) => write!(f, "invalid byte {byte} in DICT data"),
            CffError::TruncatedDict => write!(f, "DICT data ends in the middle of an entry"),
            CffError::TruncatedCharstring => {
                write!(f, "charstring ends in the middle of an operand")
            }
            CffError::TooManyStrings => write!(f, "too many strings for a CFF string INDEX"),
            CffError::OperandOutOfRange(value) => {
                write!(f, "charstring operand {value} is out of range")
            }
        }
    }
}

impl std::error::Error for CffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CffError::Draw { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PostScriptError> for CffError {
    fn from(value: PostScriptError) -> Self {
        CffError::PostScript(value)
    }
}

impl From<ReadError> for CffError {
    fn from(value: ReadError) -> Self {
        CffError::Read(value)
    }
}

/// One charstring per glyph, plus the font level data needed to write a
/// complete `CFF ` table.
#[derive(Clone, Debug)]
pub struct CffOutlines {
    info: CffFontInfo,
    charstrings: Vec<Vec<u8>>,
    default_width_x: i32,
    nominal_width_x: i32,
}

impl CffOutlines {
    /// Encode `outlines`, choosing the private dictionary widths from the
    /// glyph advances.
    ///
    /// `defaultWidthX` is the most common advance and `nominalWidthX` is set
    /// to the same value, so most charstrings carry no width at all.
    pub fn new(
        info: CffFontInfo,
        outlines: &[GlyphOutline],
        advances: &[u16],
    ) -> Result<Self, CffError> {
        let default_width_x = most_common(advances).unwrap_or(0) as i32;
        let mut this = Self {
            info,
            charstrings: Vec::with_capacity(outlines.len()),
            default_width_x,
            nominal_width_x: default_width_x,
        };
        for (gid, outline) in outlines.iter().enumerate() {
            let advance = advances.get(gid).copied().unwrap_or_default();
            let charstring = charstring::encode(outline, this.width_operand(advance))?;
            this.charstrings.push(charstring);
        }
        Ok(this)
    }

    pub fn info(&self) -> &CffFontInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.charstrings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charstrings.is_empty()
    }

    pub fn default_width_x(&self) -> i32 {
        self.default_width_x
    }

    pub fn nominal_width_x(&self) -> i32 {
        self.nominal_width_x
    }

    /// The raw charstring for a glyph.
    pub fn charstring(&self, gid: usize) -> Option<&[u8]> {
        self.charstrings.get(gid).map(Vec::as_slice)
    }

    pub fn charstrings(&self) -> &[Vec<u8>] {
        &self.charstrings
    }

    /// Evaluate the charstring of a glyph; `None` if there is no such glyph.
    pub fn outline(&self, gid: usize) -> Option<Result<GlyphOutline, CffError>> {
        self.charstrings.get(gid).map(|data| charstring::decode(data))
    }

    /// Replace the charstring of a glyph.
    ///
    /// Returns `false` if the glyph does not exist. On error the old
    /// charstring is kept.
    pub fn set_outline(
        &mut self,
        gid: usize,
        outline: &GlyphOutline,
        advance: u16,
    ) -> Result<bool, CffError> {
        let width = self.width_operand(advance);
        match self.charstrings.get_mut(gid) {
            Some(slot) => {
                *slot = charstring::encode(outline, width)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write a complete `CFF ` table.
    ///
    /// `glyph_names` provides the charset; `font_bbox` is written as the
    /// top dictionary's `FontBBox`.
    pub fn compile(&self, glyph_names: &[String], font_bbox: [i32; 4]) -> Result<Vec<u8>, CffError> {
        compile(CompileInput {
            info: &self.info,
            glyph_names,
            charstrings: &self.charstrings,
            default_width_x: self.default_width_x,
            nominal_width_x: self.nominal_width_x,
            font_bbox,
        })
    }

    fn width_operand(&self, advance: u16) -> Option<i32> {
        let advance = advance as i32;
        (advance != self.default_width_x).then_some(advance - self.nominal_width_x)
    }
}

/// The most frequent value, preferring the smallest on ties.
fn most_common(values: &[u16]) -> Option<u16> {
    let mut counts: HashMap<u16, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then(b.cmp(a)))
        .map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use write_fonts::types::Fixed;

    use super::*;
    use crate::outline::tests::rect_contour;

    #[test]
    fn widths_from_advances() {
        assert_eq!(most_common(&[500, 600, 600, 500, 250]), Some(500));
        assert_eq!(most_common(&[]), None);

        let square: GlyphOutline = [rect_contour(0.0, 0.0, 10.0, 10.0)].into_iter().collect();
        let outlines = vec![GlyphOutline::new(), square.clone(), square];
        let cff = CffOutlines::new(CffFontInfo::default(), &outlines, &[500, 600, 600]).unwrap();
        assert_eq!(cff.default_width_x(), 600);
        assert_eq!(cff.nominal_width_x(), 600);
        let width = |gid| charstring::width(cff.charstring(gid).unwrap()).unwrap();
        assert_eq!(width(0), Some(Fixed::from_i32(-100)));
        assert_eq!(width(1), None);
        assert_eq!(cff.outline(2).unwrap().unwrap(), outlines[2]);
        assert!(cff.outline(3).is_none());
    }

    #[test]
    fn replace_outline() {
        let mut cff =
            CffOutlines::new(CffFontInfo::default(), &[GlyphOutline::new()], &[500]).unwrap();
        let square: GlyphOutline = [rect_contour(0.0, 0.0, 10.0, 10.0)].into_iter().collect();
        assert!(cff.set_outline(0, &square, 700).unwrap());
        assert!(!cff.set_outline(1, &square, 700).unwrap());
        assert_eq!(cff.outline(0).unwrap().unwrap(), square);
        assert_eq!(
            charstring::width(cff.charstring(0).unwrap()).unwrap(),
            Some(Fixed::from_i32(200))
        );
    }
}
