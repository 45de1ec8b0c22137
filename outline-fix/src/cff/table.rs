//! Reading and writing the `CFF ` table around a set of charstrings.

use std::collections::HashMap;

use skrifa::{string::StringId, MetadataProvider};
use write_fonts::read::tables::cff::Cff;
use write_fonts::read::tables::postscript::{dict, STANDARD_STRINGS};
use write_fonts::read::{FontRef, TableProvider};

use super::dict::{
    self as raw, DictWriter, CHARSET, CHARSTRINGS, DEFAULT_WIDTH_X, ENCODING, FAMILY_NAME,
    FONT_BBOX, FULL_NAME, IS_FIXED_PITCH, ITALIC_ANGLE, NOMINAL_WIDTH_X, PRIVATE, SUBRS,
    UNDERLINE_POSITION, UNDERLINE_THICKNESS, VERSION,
};
use super::CffError;

/// The first string id after the standard strings.
const FIRST_CUSTOM_SID: usize = 391;

/// The parts of a `CFF ` table that survive rewriting its charstrings.
///
/// Dictionary entries that point at the charset, the charstrings or the
/// local subroutines are not kept; they are regenerated on compile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CffFontInfo {
    name: Vec<u8>,
    top_dict: Vec<u8>,
    private_dict: Vec<u8>,
    strings: Vec<Vec<u8>>,
}

impl CffFontInfo {
    /// Read the first font of a `CFF ` table.
    ///
    /// CID-keyed fonts are rejected.
    pub fn read(cff: &Cff) -> Result<Self, CffError> {
        let name = cff.names().get(0)?.to_vec();
        let top_dict = cff.top_dicts().get(0)?;
        let mut private_range = None;
        for entry in dict::entries(top_dict, None) {
            match entry? {
                dict::Entry::Ros { .. } => return Err(CffError::CidKeyed),
                dict::Entry::PrivateDictRange(range) => private_range = Some(range),
                _ => (),
            }
        }
        let private_dict = match private_range {
            Some(range) => {
                let data = cff
                    .offset_data()
                    .as_bytes()
                    .get(range)
                    .ok_or(CffError::TruncatedDict)?;
                raw::filter(data, &[SUBRS, DEFAULT_WIDTH_X, NOMINAL_WIDTH_X])?
            }
            None => Vec::new(),
        };
        let strings = cff.strings();
        let strings = (0..strings.count() as usize)
            .map(|ix| strings.get(ix).map(<[u8]>::to_vec))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name,
            top_dict: raw::filter(
                top_dict,
                &[CHARSET, ENCODING, CHARSTRINGS, PRIVATE, FONT_BBOX],
            )?,
            private_dict,
            strings,
        })
    }

    /// Build the font info for a font that has no `CFF ` table, from its
    /// `name`, `head` and `post` tables.
    pub fn synthesize(font: &FontRef) -> Self {
        let english = |id: StringId| {
            font.localized_strings(id)
                .english_or_first()
                .map(|string| string.to_string())
        };
        let ps_name = english(StringId::POSTSCRIPT_NAME).unwrap_or_else(|| "Untitled".into());
        let mut info = Self {
            name: ps_name.into_bytes(),
            ..Default::default()
        };
        let mut top = DictWriter::default();
        if let Ok(head) = font.head() {
            // three decimal places, trailing zeros dropped from the minor part
            let revision = (head.font_revision().to_f64() * 1000.0).round() as i64;
            let version = format!("{}.{}", revision / 1000, revision % 1000);
            let sid = info.add_string(version.as_bytes());
            top.int(sid as i32).op(VERSION);
        }
        if let Some(full_name) = english(StringId::FULL_NAME) {
            let sid = info.add_string(full_name.as_bytes());
            top.int(sid as i32).op(FULL_NAME);
        }
        if let Some(family_name) = english(StringId::FAMILY_NAME) {
            let sid = info.add_string(family_name.as_bytes());
            top.int(sid as i32).op(FAMILY_NAME);
        }
        if let Ok(post) = font.post() {
            if post.is_fixed_pitch() != 0 {
                top.int(1).op(IS_FIXED_PITCH);
            }
            top.number(post.italic_angle().to_f64()).op(ITALIC_ANGLE);
            top.int(post.underline_position().to_i16() as i32)
                .op(UNDERLINE_POSITION);
            top.int(post.underline_thickness().to_i16() as i32)
                .op(UNDERLINE_THICKNESS);
        }
        info.top_dict = top.into_bytes();
        info
    }

    /// The PostScript name of the font.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns the string id of `string`, adding it to the string INDEX if
    /// it is neither a standard string nor already present.
    fn add_string(&mut self, string: &[u8]) -> u16 {
        if let Some(ix) = STANDARD_STRINGS.iter().position(|s| s.as_bytes() == string) {
            return ix as u16;
        }
        let ix = match self.strings.iter().position(|s| s == string) {
            Some(ix) => ix,
            None => {
                self.strings.push(string.to_vec());
                self.strings.len() - 1
            }
        };
        (FIRST_CUSTOM_SID + ix) as u16
    }
}

/// Everything needed to write the table.
pub(crate) struct CompileInput<'a> {
    pub info: &'a CffFontInfo,
    pub glyph_names: &'a [String],
    pub charstrings: &'a [Vec<u8>],
    pub default_width_x: i32,
    pub nominal_width_x: i32,
    pub font_bbox: [i32; 4],
}

/// Write a `CFF ` table with a format 0 charset and no subroutines.
pub(crate) fn compile(input: CompileInput) -> Result<Vec<u8>, CffError> {
    let mut strings = input.info.strings.clone();
    let standard: HashMap<&[u8], u16> = STANDARD_STRINGS
        .iter()
        .enumerate()
        .map(|(ix, s)| (s.as_bytes(), ix as u16))
        .collect();
    let mut custom: HashMap<Vec<u8>, u16> = strings
        .iter()
        .enumerate()
        .map(|(ix, s)| (s.clone(), (FIRST_CUSTOM_SID + ix) as u16))
        .collect();

    // charset format 0: one SID per glyph, .notdef excluded
    let mut charset = vec![0u8];
    for name in input.glyph_names.iter().skip(1) {
        let bytes = name.as_bytes();
        let sid = match standard.get(bytes).or_else(|| custom.get(bytes)) {
            Some(sid) => *sid,
            None => {
                let sid = FIRST_CUSTOM_SID + strings.len();
                if sid > u16::MAX as usize {
                    return Err(CffError::TooManyStrings);
                }
                strings.push(bytes.to_vec());
                custom.insert(bytes.to_vec(), sid as u16);
                sid as u16
            }
        };
        charset.extend_from_slice(&sid.to_be_bytes());
    }

    let mut private = DictWriter::default();
    private.raw(&input.info.private_dict);
    if input.default_width_x != 0 {
        private.int(input.default_width_x).op(DEFAULT_WIDTH_X);
    }
    if input.nominal_width_x != 0 {
        private.int(input.nominal_width_x).op(NOMINAL_WIDTH_X);
    }
    let private = private.into_bytes();

    let top_dict = |charset: i32, charstrings: i32, private_offset: i32| {
        let mut top = DictWriter::default();
        top.raw(&input.info.top_dict);
        for value in input.font_bbox {
            top.int(value);
        }
        top.op(FONT_BBOX);
        top.fixed_int(charset);
        top.op(CHARSET);
        top.fixed_int(charstrings);
        top.op(CHARSTRINGS);
        top.fixed_int(private.len() as i32);
        top.fixed_int(private_offset);
        top.op(PRIVATE);
        top.into_bytes()
    };

    let header = [1u8, 0, 4, 4];
    let name_index = raw::index(&[&input.info.name]);
    let string_index = raw::index(&strings);
    let global_subrs = raw::index::<&[u8]>(&[]);
    let charstrings = raw::index(input.charstrings);
    // offsets are fixed size, so the dictionary length is known up front
    let top_index_len = raw::index(&[top_dict(0, 0, 0)]).len();

    let charset_offset = header.len()
        + name_index.len()
        + top_index_len
        + string_index.len()
        + global_subrs.len();
    let charstrings_offset = charset_offset + charset.len();
    let private_offset = charstrings_offset + charstrings.len();
    let top_index = raw::index(&[top_dict(
        charset_offset as i32,
        charstrings_offset as i32,
        private_offset as i32,
    )]);

    let mut data = Vec::with_capacity(private_offset + private.len());
    data.extend_from_slice(&header);
    data.extend_from_slice(&name_index);
    data.extend_from_slice(&top_index);
    data.extend_from_slice(&string_index);
    data.extend_from_slice(&global_subrs);
    data.extend_from_slice(&charset);
    data.extend_from_slice(&charstrings);
    data.extend_from_slice(&private);
    Ok(data)
}
