//! Compiling the font model back into a binary font.

use write_fonts::from_obj::ToOwnedTable;
use write_fonts::read::{FontRef, TableProvider};
use write_fonts::tables::{
    glyf::{Bbox, GlyfLocaBuilder, Glyph},
    head::Head,
    hhea::Hhea,
    hmtx::{Hmtx, LongMetric},
    maxp::Maxp,
    post::Post,
};
use write_fonts::types::{FWord, Tag, UfWord, Version16Dot16};
use write_fonts::FontBuilder;

use super::{without_instructions, OutlineFont, Outlines};
use crate::outline::OutlineFormat;
use crate::Error;

const OTTO: u32 = 0x4F54_544F;
const TRUETYPE: u32 = 0x0001_0000;

/// Tables that only apply to TrueType hinting.
const HINTING_TABLES: [Tag; 6] = [
    Tag::new(b"fpgm"),
    Tag::new(b"prep"),
    Tag::new(b"cvt "),
    Tag::new(b"hdmx"),
    Tag::new(b"LTSH"),
    Tag::new(b"VDMX"),
];

/// Tables that only apply to `glyf` outlines.
const TRUETYPE_TABLES: [Tag; 5] = [
    Tag::new(b"glyf"),
    Tag::new(b"loca"),
    Tag::new(b"gasp"),
    Tag::new(b"cvar"),
    Tag::new(b"gvar"),
];

/// Tables that only apply to PostScript outlines.
const POSTSCRIPT_TABLES: [Tag; 3] = [Tag::new(b"CFF "), Tag::new(b"CFF2"), Tag::new(b"VORG")];

/// Recursion limit when computing composite statistics for `maxp`.
const MAX_COMPONENT_DEPTH: u16 = 64;

impl OutlineFont {
    /// Compile the font, taking every table this model does not own from
    /// `source`, which must be the font the model was loaded from.
    ///
    /// Writes the outline tables, `hmtx`, `hhea`, `head` and `maxp`, and a
    /// new `post` table when the outline format has changed.
    pub fn build(&self, source: &[u8]) -> Result<Vec<u8>, Error> {
        let font = FontRef::new(source)?;
        let mut head: Head = font.head()?.to_owned_table();
        let mut hhea: Hhea = font.hhea()?.to_owned_table();
        let mut maxp: Maxp = font.maxp()?.to_owned_table();
        let mut builder = FontBuilder::new();
        let mut dropped: Vec<Tag> = Vec::new();

        let extents = self.glyph_extents()?;
        let font_bbox = extents
            .iter()
            .flatten()
            .copied()
            .reduce(Bbox::union)
            .unwrap_or_default();
        head.x_min = font_bbox.x_min;
        head.y_min = font_bbox.y_min;
        head.x_max = font_bbox.x_max;
        head.y_max = font_bbox.y_max;
        maxp.num_glyphs = self.num_glyphs() as u16;

        match &self.outlines {
            Outlines::Glyf(glyphs) => {
                let mut glyf_loca = GlyfLocaBuilder::new();
                for glyph in glyphs {
                    match (self.drop_hinting, glyph) {
                        (true, Glyph::Simple(simple)) if !simple.instructions.is_empty() => {
                            let mut simple = simple.clone();
                            simple.instructions.clear();
                            glyf_loca.add_glyph(&simple)?;
                        }
                        (true, Glyph::Composite(composite)) => {
                            glyf_loca.add_glyph(&without_instructions(composite))?;
                        }
                        _ => {
                            glyf_loca.add_glyph(glyph)?;
                        }
                    }
                }
                let (glyf, loca, loca_format) = glyf_loca.build();
                head.index_to_loc_format = loca_format as i16;
                builder.add_table(&glyf)?;
                builder.add_table(&loca)?;
                self.update_truetype_maxp(glyphs, &mut maxp);
                dropped.extend(POSTSCRIPT_TABLES);
                if self.drop_hinting {
                    dropped.extend(HINTING_TABLES);
                }
            }
            Outlines::Cff(cff) => {
                let bbox = [
                    font_bbox.x_min as i32,
                    font_bbox.y_min as i32,
                    font_bbox.x_max as i32,
                    font_bbox.y_max as i32,
                ];
                builder.add_raw(Tag::new(b"CFF "), cff.compile(&self.glyph_names, bbox)?);
                // version 0.5
                maxp = Maxp::new(self.num_glyphs() as u16);
                dropped.extend(TRUETYPE_TABLES);
                dropped.extend(HINTING_TABLES);
                dropped.extend([Tag::new(b"CFF2")]);
            }
        }

        if self.format() != self.source_format {
            let source_post: Option<Post> = font.post().ok().map(|post| post.to_owned_table());
            let mut post = match self.format() {
                OutlineFormat::TrueType => {
                    Post::new_v2(self.glyph_names.iter().map(String::as_str))
                }
                OutlineFormat::PostScript => Post {
                    version: Version16Dot16::VERSION_3_0,
                    ..Default::default()
                },
            };
            if let Some(source) = source_post {
                post.italic_angle = source.italic_angle;
                post.underline_position = source.underline_position;
                post.underline_thickness = source.underline_thickness;
                post.is_fixed_pitch = source.is_fixed_pitch;
            }
            builder.add_table(&post)?;
        }

        let hmtx = self.compile_metrics(&extents, &mut hhea);
        builder.add_table(&head)?;
        builder.add_table(&hhea)?;
        builder.add_table(&hmtx)?;
        builder.add_table(&maxp)?;

        for record in font.table_directory().table_records() {
            let tag = record.tag();
            if builder.contains(tag) || dropped.contains(&tag) {
                continue;
            }
            match font.data_for_tag(tag) {
                Some(data) => {
                    builder.add_raw(tag, data.as_bytes());
                }
                None => log::warn!("data for '{tag}' is malformed, dropping it"),
            }
        }
        for tag in dropped.iter().filter(|tag| font.data_for_tag(**tag).is_some()) {
            log::info!("dropping '{tag}' table");
        }

        let mut data = builder.build();
        if self.format() == OutlineFormat::PostScript {
            mark_as_cff(&mut data);
        }
        Ok(data)
    }

    /// The bounding box of every glyph, `None` for glyphs without contours.
    fn glyph_extents(&self) -> Result<Vec<Option<Bbox>>, Error> {
        match &self.outlines {
            Outlines::Glyf(glyphs) => Ok(glyphs.iter().map(Glyph::bbox).collect()),
            Outlines::Cff(cff) => (0..cff.len())
                .map(|gid| {
                    let outline = match cff.outline(gid) {
                        Some(outline) => outline?,
                        None => return Ok(None),
                    };
                    Ok(outline.bounds().map(|rect| Bbox {
                        x_min: rect.x0.floor() as i16,
                        y_min: rect.y0.floor() as i16,
                        x_max: rect.x1.ceil() as i16,
                        y_max: rect.y1.ceil() as i16,
                    }))
                })
                .collect(),
        }
    }

    /// Build `hmtx`, storing the advances of the trailing run of equal
    /// advances only once, and update the `hhea` statistics.
    fn compile_metrics(&self, extents: &[Option<Bbox>], hhea: &mut Hhea) -> Hmtx {
        let metrics = &self.metrics;
        let mut num_long = metrics.len();
        while num_long > 1 && metrics[num_long - 2].advance == metrics[num_long - 1].advance {
            num_long -= 1;
        }
        let hmtx = Hmtx::new(
            metrics[..num_long]
                .iter()
                .map(|m| LongMetric::new(m.advance, m.lsb))
                .collect(),
            metrics[num_long..].iter().map(|m| m.lsb).collect(),
        );

        let mut min_lsb = i16::MAX;
        let mut min_rsb = i16::MAX;
        let mut max_extent = i16::MIN;
        for (metrics, bbox) in metrics.iter().zip(extents) {
            let Some(bbox) = bbox else {
                continue;
            };
            let width = bbox.x_max as i32 - bbox.x_min as i32;
            let extent = metrics.lsb as i32 + width;
            min_lsb = min_lsb.min(metrics.lsb);
            min_rsb = min_rsb.min(saturate(metrics.advance as i32 - extent));
            max_extent = max_extent.max(saturate(extent));
        }
        if extents.iter().all(Option::is_none) {
            (min_lsb, min_rsb, max_extent) = (0, 0, 0);
        }
        let advance_width_max = metrics.iter().map(|m| m.advance).max().unwrap_or_default();
        hhea.advance_width_max = UfWord::new(advance_width_max);
        hhea.min_left_side_bearing = FWord::new(min_lsb);
        hhea.min_right_side_bearing = FWord::new(min_rsb);
        hhea.x_max_extent = FWord::new(max_extent);
        hhea.number_of_h_metrics = num_long as u16;
        hmtx
    }

    fn update_truetype_maxp(&self, glyphs: &[Glyph], maxp: &mut Maxp) {
        let mut max_points = 0u16;
        let mut max_contours = 0u16;
        let mut max_composite_points = 0u16;
        let mut max_composite_contours = 0u16;
        let mut max_component_elements = 0u16;
        let mut max_component_depth = 0u16;
        for glyph in glyphs {
            match glyph {
                Glyph::Simple(simple) => {
                    let points: usize = simple.contours.iter().map(|c| c.len()).sum();
                    max_points = max_points.max(points as u16);
                    max_contours = max_contours.max(simple.contours.len() as u16);
                }
                Glyph::Composite(composite) => {
                    let (points, contours, depth) = composite_stats(glyphs, glyph, 0);
                    max_composite_points = max_composite_points.max(points);
                    max_composite_contours = max_composite_contours.max(contours);
                    max_component_elements =
                        max_component_elements.max(composite.components().len() as u16);
                    max_component_depth = max_component_depth.max(depth);
                }
                Glyph::Empty => (),
            }
        }
        maxp.max_points = Some(max_points);
        maxp.max_contours = Some(max_contours);
        maxp.max_composite_points = Some(max_composite_points);
        maxp.max_composite_contours = Some(max_composite_contours);
        maxp.max_component_elements = Some(max_component_elements);
        maxp.max_component_depth = Some(max_component_depth);
        if self.drop_hinting || maxp.max_zones.is_none() {
            maxp.max_zones = Some(1);
            maxp.max_twilight_points = Some(0);
            maxp.max_storage = Some(0);
            maxp.max_function_defs = Some(0);
            maxp.max_instruction_defs = Some(0);
            maxp.max_stack_elements = Some(0);
            maxp.max_size_of_instructions = Some(0);
        }
    }
}

/// Points, contours and nesting depth of a glyph with its components
/// resolved.
fn composite_stats(glyphs: &[Glyph], glyph: &Glyph, depth: u16) -> (u16, u16, u16) {
    match glyph {
        Glyph::Empty => (0, 0, 0),
        Glyph::Simple(simple) => {
            let points: usize = simple.contours.iter().map(|c| c.len()).sum();
            (points as u16, simple.contours.len() as u16, 0)
        }
        Glyph::Composite(_) if depth >= MAX_COMPONENT_DEPTH => (0, 0, 0),
        Glyph::Composite(composite) => {
            composite
                .components()
                .iter()
                .filter_map(|component| glyphs.get(component.glyph.to_u16() as usize))
                .map(|child| composite_stats(glyphs, child, depth + 1))
                .fold((0, 0, 1), |(points, contours, max_depth), (p, c, d)| {
                    (
                        points.saturating_add(p),
                        contours.saturating_add(c),
                        max_depth.max(d + 1),
                    )
                })
        }
    }
}

fn saturate(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Set the sfnt version to `OTTO` and fix up `head.checkSumAdjustment`.
pub(crate) fn mark_as_cff(data: &mut [u8]) {
    if data.len() < 4 {
        return;
    }
    data[..4].copy_from_slice(&OTTO.to_be_bytes());
    // the directory checksum grew by the difference of the two versions
    let head_offset = FontRef::new(data).ok().and_then(|font| {
        font.table_directory()
            .table_records()
            .iter()
            .find(|record| record.tag() == Tag::new(b"head"))
            .map(|record| record.offset() as usize)
    });
    let Some(offset) = head_offset else {
        return;
    };
    let Some(field) = data.get_mut(offset + 8..offset + 12) else {
        return;
    };
    let adjustment = u32::from_be_bytes([field[0], field[1], field[2], field[3]]);
    let adjustment = adjustment.wrapping_sub(OTTO.wrapping_sub(TRUETYPE));
    field.copy_from_slice(&adjustment.to_be_bytes());
}
