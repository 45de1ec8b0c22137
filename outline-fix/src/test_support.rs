//! Small fonts built in memory for unit tests.

use kurbo::{Point, Rect};
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::read::{FontRef, TableProvider};
use write_fonts::tables::{
    glyf::{
        Anchor, Bbox, Component, ComponentFlags, CompositeGlyph, Contour as GlyfContour,
        GlyfLocaBuilder, Glyph, SimpleGlyph, Transform,
    },
    head::Head,
    hhea::Hhea,
    hmtx::{Hmtx, LongMetric},
    maxp::Maxp,
    name::{Name, NameRecord},
    post::Post,
};
use write_fonts::types::{F2Dot14, GlyphId16, NameId, Tag, Version16Dot16};
use write_fonts::FontBuilder;

use crate::cff::{CffFontInfo, CffOutlines};
use crate::outline::{Contour, GlyphOutline, Segment, Winding};
use crate::simplify::{GeometryError, PathSimplifier};

const DEFAULT_ADVANCE: u16 = 600;

/// A glyph description for [`glyf_font`] and [`cff_font`].
#[derive(Clone, Debug)]
pub(crate) struct TestGlyph {
    shape: Shape,
    advance: u16,
    instructions: Vec<u8>,
    scale: Option<f32>,
}

#[derive(Clone, Debug)]
enum Shape {
    Contours(Vec<Vec<(i16, i16, bool)>>),
    Composite(Vec<(u16, i16, i16)>),
}

impl TestGlyph {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            advance: DEFAULT_ADVANCE,
            instructions: Vec::new(),
            scale: None,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Shape::Contours(Vec::new()))
    }

    /// A clockwise rectangle.
    pub(crate) fn rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Self {
        Self::new(Shape::Contours(vec![vec![
            (x0, y0, true),
            (x0, y1, true),
            (x1, y1, true),
            (x1, y0, true),
        ]]))
    }

    /// Contours given as TrueType points `(x, y, on_curve)`.
    pub(crate) fn contours(contours: &[&[(i16, i16, bool)]]) -> Self {
        Self::new(Shape::Contours(
            contours.iter().map(|points| points.to_vec()).collect(),
        ))
    }

    /// A composite of `(glyph id, dx, dy)` components.
    pub(crate) fn composite(components: &[(u16, i16, i16)]) -> Self {
        Self::new(Shape::Composite(components.to_vec()))
    }

    /// Scale every component uniformly.
    pub(crate) fn scaled(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub(crate) fn with_instructions(mut self, instructions: &[u8]) -> Self {
        self.instructions = instructions.to_vec();
        self
    }

    pub(crate) fn with_advance(mut self, advance: u16) -> Self {
        self.advance = advance;
        self
    }

    fn point_bbox(&self) -> Option<Bbox> {
        let Shape::Contours(contours) = &self.shape else {
            return None;
        };
        let mut points = contours.iter().flatten();
        let &(x, y, _) = points.next()?;
        let first = Bbox {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        };
        Some(points.fold(first, |bbox, &(x, y, _)| Bbox {
            x_min: bbox.x_min.min(x),
            y_min: bbox.y_min.min(y),
            x_max: bbox.x_max.max(x),
            y_max: bbox.y_max.max(y),
        }))
    }

    /// The cubic outline drawn counter-clockwise, for CFF fonts.
    fn postscript_outline(&self) -> GlyphOutline {
        let Shape::Contours(contours) = &self.shape else {
            return GlyphOutline::new();
        };
        contours
            .iter()
            .filter_map(|points| {
                let (first, rest) = points.split_first()?;
                let at = |&(x, y, _): &(i16, i16, bool)| Point::new(x as f64, y as f64);
                let contour = Contour::new(at(first), rest.iter().map(|p| Segment::LineTo(at(p))));
                Some(contour.reversed())
            })
            .collect()
    }
}

fn build_glyph(glyph: &TestGlyph, all: &[(&str, TestGlyph)]) -> Glyph {
    match &glyph.shape {
        Shape::Contours(contours) if contours.is_empty() => Glyph::Empty,
        Shape::Contours(contours) => {
            let mut simple = SimpleGlyph {
                contours: contours
                    .iter()
                    .map(|points| {
                        points
                            .iter()
                            .map(|&(x, y, on)| CurvePoint::new(x, y, on))
                            .collect::<Vec<_>>()
                            .into()
                    })
                    .collect::<Vec<GlyfContour>>(),
                instructions: glyph.instructions.clone(),
                ..Default::default()
            };
            simple.recompute_bounding_box();
            simple.into()
        }
        Shape::Composite(components) => {
            let scale = glyph.scale.unwrap_or(1.0);
            let transform = match glyph.scale {
                Some(scale) => Transform {
                    xx: F2Dot14::from_f32(scale),
                    yy: F2Dot14::from_f32(scale),
                    ..Default::default()
                },
                None => Transform::default(),
            };
            let mut composite: Option<CompositeGlyph> = None;
            for &(gid, dx, dy) in components {
                let component = Component::new(
                    GlyphId16::new(gid),
                    Anchor::Offset { x: dx, y: dy },
                    transform,
                    ComponentFlags::default(),
                );
                let bbox = all
                    .get(gid as usize)
                    .and_then(|(_, child)| child.point_bbox())
                    .map(|bbox| {
                        Bbox::from(Rect::new(
                            bbox.x_min as f64 * scale as f64 + dx as f64,
                            bbox.y_min as f64 * scale as f64 + dy as f64,
                            bbox.x_max as f64 * scale as f64 + dx as f64,
                            bbox.y_max as f64 * scale as f64 + dy as f64,
                        ))
                    })
                    .unwrap_or_default();
                match composite.as_mut() {
                    Some(composite) => composite.add_component(component, bbox),
                    None => composite = Some(CompositeGlyph::new(component, bbox)),
                }
            }
            composite.map(Glyph::Composite).unwrap_or(Glyph::Empty)
        }
    }
}

fn name_table() -> Name {
    let record = |id: u16, value: &str| {
        NameRecord::new(3, 1, 0x409, NameId::new(id), String::from(value).into())
    };
    Name::new(
        [
            record(1, "Test"),
            record(4, "Test Regular"),
            record(6, "Test-Regular"),
        ]
        .into_iter()
        .collect(),
    )
}

/// Add `head`, `hhea`, `hmtx` and `name` for `glyphs`.
fn add_common_tables(
    builder: &mut FontBuilder,
    glyphs: &[(&str, TestGlyph)],
    bbox: Bbox,
    loca_format: i16,
) {
    let head = Head {
        units_per_em: 1000,
        x_min: bbox.x_min,
        y_min: bbox.y_min,
        x_max: bbox.x_max,
        y_max: bbox.y_max,
        index_to_loc_format: loca_format,
        ..Default::default()
    };
    let hmtx = Hmtx::new(
        glyphs
            .iter()
            .map(|(_, glyph)| {
                let lsb = glyph.point_bbox().map(|b| b.x_min).unwrap_or_default();
                LongMetric::new(glyph.advance, lsb)
            })
            .collect(),
        Vec::new(),
    );
    let hhea = Hhea {
        ascender: 800.into(),
        descender: (-200).into(),
        number_of_h_metrics: glyphs.len() as u16,
        ..Default::default()
    };
    builder.add_table(&head).unwrap();
    builder.add_table(&hhea).unwrap();
    builder.add_table(&hmtx).unwrap();
    builder.add_table(&name_table()).unwrap();
}

fn font_bbox(boxes: impl IntoIterator<Item = Option<Bbox>>) -> Bbox {
    boxes
        .into_iter()
        .flatten()
        .reduce(Bbox::union)
        .unwrap_or_default()
}

/// A TrueType font with the given glyphs, 1000 units per em.
pub(crate) fn glyf_font(glyphs: &[(&str, TestGlyph)]) -> Vec<u8> {
    let mut glyf_loca = GlyfLocaBuilder::new();
    let built: Vec<Glyph> = glyphs
        .iter()
        .map(|(_, glyph)| build_glyph(glyph, glyphs))
        .collect();
    for glyph in &built {
        glyf_loca.add_glyph(glyph).unwrap();
    }
    let (glyf, loca, loca_format) = glyf_loca.build();
    let maxp = Maxp {
        num_glyphs: glyphs.len() as u16,
        max_points: Some(0),
        max_contours: Some(0),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(2),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(16),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
    };
    let mut builder = FontBuilder::new();
    add_common_tables(
        &mut builder,
        glyphs,
        font_bbox(built.iter().map(Glyph::bbox)),
        loca_format as i16,
    );
    builder.add_table(&maxp).unwrap();
    builder
        .add_table(&Post::new_v2(glyphs.iter().map(|(name, _)| *name)))
        .unwrap();
    builder.add_table(&glyf).unwrap();
    builder.add_table(&loca).unwrap();
    builder.build()
}

/// A CFF flavored font with the given glyphs; composites are left empty.
pub(crate) fn cff_font(glyphs: &[(&str, TestGlyph)]) -> Vec<u8> {
    let bbox = font_bbox(glyphs.iter().map(|(_, glyph)| glyph.point_bbox()));
    let mut builder = FontBuilder::new();
    add_common_tables(&mut builder, glyphs, bbox, 0);
    builder.add_table(&Maxp::new(glyphs.len() as u16)).unwrap();
    builder
        .add_table(&Post {
            version: Version16Dot16::VERSION_3_0,
            ..Default::default()
        })
        .unwrap();
    let base = builder.build();
    let info = CffFontInfo::synthesize(&FontRef::new(&base).unwrap());

    let outlines: Vec<_> = glyphs
        .iter()
        .map(|(_, glyph)| glyph.postscript_outline())
        .collect();
    let advances: Vec<_> = glyphs.iter().map(|(_, glyph)| glyph.advance).collect();
    let names: Vec<String> = glyphs.iter().map(|(name, _)| name.to_string()).collect();
    let cff = CffOutlines::new(info, &outlines, &advances)
        .unwrap()
        .compile(
            &names,
            [
                bbox.x_min as i32,
                bbox.y_min as i32,
                bbox.x_max as i32,
                bbox.y_max as i32,
            ],
        )
        .unwrap();
    let mut data = with_raw_tables(&base, &[(*b"CFF ", &cff[..])]);
    crate::font::mark_as_cff(&mut data);
    data
}

/// A copy of `font` with extra tables added or replaced.
pub(crate) fn with_raw_tables(font: &[u8], tables: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let source = FontRef::new(font).unwrap();
    let mut builder = FontBuilder::new();
    for (tag, data) in tables {
        builder.add_raw(Tag::new(tag), *data);
    }
    for record in source.table_directory().table_records() {
        if !builder.contains(record.tag()) {
            let data = source.data_for_tag(record.tag()).unwrap();
            builder.add_raw(record.tag(), data.as_bytes());
        }
    }
    builder.build()
}

/// Coordinates at which [`FakeSimplifier`] fails.
pub(crate) const POISON: f64 = 6666.0;

/// A predictable [`PathSimplifier`].
///
/// Simplifying reorients every contour as an outer contour and fails on any
/// point with an x coordinate of [`POISON`]; outlines intersect when their
/// bounding boxes overlap.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FakeSimplifier;

impl PathSimplifier for FakeSimplifier {
    fn simplify(
        &self,
        outline: &GlyphOutline,
        winding: Winding,
    ) -> Result<GlyphOutline, GeometryError> {
        if outline.points().any(|pt| pt.x == POISON) {
            return Err(GeometryError::Engine("poisoned".into()));
        }
        Ok(outline
            .contours()
            .iter()
            .map(|contour| match winding.oriented_area(contour) < 0.0 {
                true => contour.reversed(),
                false => contour.clone(),
            })
            .collect())
    }

    fn intersects(&self, a: &GlyphOutline, b: &GlyphOutline) -> Result<bool, GeometryError> {
        let (Some(a), Some(b)) = (a.bounds(), b.bounds()) else {
            return Ok(false);
        };
        Ok(a.intersect(b).area() > 0.0)
    }
}

#[test]
fn cff_test_font_loads() {
    let data = cff_font(&[(".notdef", TestGlyph::empty()), ("A", TestGlyph::rect(0, 0, 10, 10))]);
    let font = FontRef::new(&data).unwrap();
    assert_eq!(font.table_directory().sfnt_version(), 0x4F54_544F);
    assert!(font.cff().is_ok());
    assert!(font.glyf().is_err());
}
