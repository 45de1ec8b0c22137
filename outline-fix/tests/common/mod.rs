//! TrueType fonts built in memory for the integration tests.

use outline_fix::simplify::{GeometryError, PathSimplifier, WindingSimplifier};
use outline_fix::{GlyphOutline, Winding};
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::tables::{
    glyf::{
        Anchor, Bbox, Component, ComponentFlags, CompositeGlyph, GlyfLocaBuilder,
        Glyph, SimpleGlyph, Transform,
    },
    head::Head,
    hhea::Hhea,
    hmtx::{Hmtx, LongMetric},
    maxp::Maxp,
    name::{Name, NameRecord},
    post::Post,
};
use write_fonts::types::{GlyphId16, NameId};
use write_fonts::FontBuilder;

pub const ADVANCE: u16 = 600;

/// Points of a TrueType contour.
pub type Points = Vec<(i16, i16, bool)>;

pub enum TestGlyph {
    Simple(Vec<Points>),
    /// `(glyph id, dx, dy)` for each component.
    Composite(Vec<(u16, i16, i16)>),
}

/// A clockwise rectangle.
pub fn rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Points {
    vec![(x0, y0, true), (x0, y1, true), (x1, y1, true), (x1, y0, true)]
}

/// A counter-clockwise rectangle, the wrong direction for TrueType.
pub fn reversed_rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Points {
    vec![(x0, y0, true), (x1, y0, true), (x1, y1, true), (x0, y1, true)]
}

/// A clockwise quadratic blob with implied on-curve points.
pub fn blob(cx: i16, cy: i16, r: i16) -> Points {
    vec![
        (cx - r, cy, true),
        (cx - r, cy + r, false),
        (cx + r, cy + r, false),
        (cx + r, cy - r, false),
        (cx - r, cy - r, false),
    ]
}

fn points_bbox(contours: &[Points]) -> Option<Bbox> {
    let mut points = contours.iter().flatten();
    let &(x, y, _) = points.next()?;
    let init = Bbox {
        x_min: x,
        y_min: y,
        x_max: x,
        y_max: y,
    };
    Some(points.fold(init, |b, &(x, y, _)| Bbox {
        x_min: b.x_min.min(x),
        y_min: b.y_min.min(y),
        x_max: b.x_max.max(x),
        y_max: b.y_max.max(y),
    }))
}

/// A TrueType font with 1000 units per em; every advance is [`ADVANCE`].
pub fn glyf_font(glyphs: &[(&str, TestGlyph)]) -> Vec<u8> {
    let mut built = Vec::new();
    for (_, glyph) in glyphs {
        let glyph = match glyph {
            TestGlyph::Simple(contours) if contours.is_empty() => Glyph::Empty,
            TestGlyph::Simple(contours) => {
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
                        .collect(),
                    ..Default::default()
                };
                simple.recompute_bounding_box();
                Glyph::Simple(simple)
            }
            TestGlyph::Composite(components) => {
                let mut composite: Option<CompositeGlyph> = None;
                for &(gid, dx, dy) in components {
                    let component = Component::new(
                        GlyphId16::new(gid),
                        Anchor::Offset { x: dx, y: dy },
                        Transform::default(),
                        ComponentFlags::default(),
                    );
                    let bbox = match &glyphs[gid as usize].1 {
                        TestGlyph::Simple(contours) => points_bbox(contours)
                            .map(|b| Bbox {
                                x_min: b.x_min + dx,
                                y_min: b.y_min + dy,
                                x_max: b.x_max + dx,
                                y_max: b.y_max + dy,
                            })
                            .unwrap_or_default(),
                        TestGlyph::Composite(_) => Bbox::default(),
                    };
                    match composite.as_mut() {
                        Some(composite) => composite.add_component(component, bbox),
                        None => composite = Some(CompositeGlyph::new(component, bbox)),
                    }
                }
                composite.map(Glyph::Composite).unwrap_or(Glyph::Empty)
            }
        };
        built.push(glyph);
    }

    let mut glyf_loca = GlyfLocaBuilder::new();
    for glyph in &built {
        glyf_loca.add_glyph(glyph).unwrap();
    }
    let (glyf, loca, loca_format) = glyf_loca.build();
    let font_bbox = built
        .iter()
        .filter_map(Glyph::bbox)
        .reduce(Bbox::union)
        .unwrap_or_default();
    let head = Head {
        units_per_em: 1000,
        x_min: font_bbox.x_min,
        y_min: font_bbox.y_min,
        x_max: font_bbox.x_max,
        y_max: font_bbox.y_max,
        index_to_loc_format: loca_format as i16,
        ..Default::default()
    };
    let hhea = Hhea {
        number_of_h_metrics: glyphs.len() as u16,
        ..Default::default()
    };
    let hmtx = Hmtx::new(
        built
            .iter()
            .map(|glyph| {
                let lsb = glyph.bbox().map(|b| b.x_min).unwrap_or_default();
                LongMetric::new(ADVANCE, lsb)
            })
            .collect(),
        Vec::new(),
    );
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
        max_size_of_instructions: Some(0),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
    };
    let record = |id: u16, value: &str| {
        NameRecord::new(3, 1, 0x409, NameId::new(id), String::from(value).into())
    };
    let name = Name::new(vec![record(1, "Sample"), record(6, "Sample-Regular")]);
    let post = Post::new_v2(glyphs.iter().map(|(name, _)| *name));

    let mut builder = FontBuilder::new();
    builder.add_table(&head).unwrap();
    builder.add_table(&hhea).unwrap();
    builder.add_table(&hmtx).unwrap();
    builder.add_table(&maxp).unwrap();
    builder.add_table(&name).unwrap();
    builder.add_table(&post).unwrap();
    builder.add_table(&glyf).unwrap();
    builder.add_table(&loca).unwrap();
    builder.add_raw(write_fonts::types::Tag::new(b"fpgm"), vec![0xb0, 0x00]);
    builder.build()
}

/// Wraps [`WindingSimplifier`] and fails on any outline that touches the
/// `x == poison` line.
pub struct PoisonedSimplifier {
    pub poison: f64,
    inner: WindingSimplifier,
}

impl PoisonedSimplifier {
    pub fn new(poison: f64) -> Self {
        Self {
            poison,
            inner: WindingSimplifier::default(),
        }
    }
}

impl PathSimplifier for PoisonedSimplifier {
    fn simplify(
        &self,
        outline: &GlyphOutline,
        winding: Winding,
    ) -> Result<GlyphOutline, GeometryError> {
        if outline.points().any(|pt| pt.x == self.poison) {
            let msg = format!("cannot handle x = {}", self.poison);
            return Err(GeometryError::Engine(msg));
        }
        self.inner.simplify(outline, winding)
    }

    fn intersects(&self, a: &GlyphOutline, b: &GlyphOutline) -> Result<bool, GeometryError> {
        self.inner.intersects(a, b)
    }
}
