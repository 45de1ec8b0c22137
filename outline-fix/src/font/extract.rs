//! Reading outlines out of the font model.

use kurbo::Affine;
use skrifa::GlyphId;
use write_fonts::tables::glyf::{Anchor, Component, Glyph, SimpleGlyph};

use super::{OutlineFont, Outlines};
use crate::outline::GlyphOutline;
use crate::quadratic::QuadraticContour;
use crate::Error;

/// A reference from a composite glyph to one of its components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComponentRef {
    pub glyph: GlyphId,
    pub transform: Affine,
}

impl OutlineFont {
    /// The outline of a glyph.
    ///
    /// With `decompose`, the components of a composite glyph are drawn in
    /// place; otherwise only the glyph's own contours are returned, which
    /// for a composite is none at all.
    pub fn outline(&self, gid: GlyphId, decompose: bool) -> Result<GlyphOutline, Error> {
        let ix = self.check_gid(gid)?;
        match &self.outlines {
            Outlines::Glyf(_) => {
                let mut outline = GlyphOutline::new();
                self.walk_glyf(gid, Affine::IDENTITY, decompose, &mut Vec::new(), &mut |glyph, transform| {
                    let own: GlyphOutline = glyph
                        .contours
                        .iter()
                        .map(|contour| QuadraticContour::from_glyf_contour(contour).to_contour())
                        .collect();
                    outline.extend(own.transform(transform));
                })?;
                Ok(outline)
            }
            Outlines::Cff(cff) => match cff.outline(ix) {
                Some(outline) => Ok(outline?),
                None => Ok(GlyphOutline::new()),
            },
        }
    }

    pub fn outline_by_name(&self, name: &str, decompose: bool) -> Result<GlyphOutline, Error> {
        self.outline(self.glyph_id(name)?, decompose)
    }

    /// The decomposed TrueType point streams of a `glyf` glyph.
    ///
    /// Component transforms are applied to the points directly, so implied
    /// on-curve points stay implied.
    pub fn quadratic_contours(&self, gid: GlyphId) -> Result<Vec<QuadraticContour>, Error> {
        self.check_gid(gid)?;
        if !matches!(self.outlines, Outlines::Glyf(_)) {
            return Err(Error::Unsupported(format!(
                "glyph '{}' has no quadratic outline",
                self.display_name(gid)
            )));
        }
        let mut contours = Vec::new();
        self.walk_glyf(gid, Affine::IDENTITY, true, &mut Vec::new(), &mut |glyph, transform| {
            contours.extend(glyph.contours.iter().map(|contour| {
                QuadraticContour::from_glyf_contour(contour).map_points(|pt| transform * pt)
            }));
        })?;
        Ok(contours)
    }

    /// `true` if the glyph is a `glyf` composite.
    pub fn is_composite(&self, gid: GlyphId) -> bool {
        matches!(
            &self.outlines,
            Outlines::Glyf(glyphs) if matches!(glyphs.get(gid.to_u32() as usize), Some(Glyph::Composite(_)))
        )
    }

    /// The direct components of a composite glyph.
    pub fn components(&self, gid: GlyphId) -> Result<Vec<ComponentRef>, Error> {
        let ix = self.check_gid(gid)?;
        let Outlines::Glyf(glyphs) = &self.outlines else {
            return Err(Error::NotComposite(self.display_name(gid)));
        };
        let Glyph::Composite(composite) = &glyphs[ix] else {
            return Err(Error::NotComposite(self.display_name(gid)));
        };
        composite
            .components()
            .iter()
            .map(|component| self.component_ref(gid, component))
            .collect()
    }

    /// How deeply components are nested below a glyph; zero for simple and
    /// empty glyphs.
    pub fn component_depth(&self, gid: GlyphId) -> Result<usize, Error> {
        self.depth(gid, &mut Vec::new())
    }

    fn depth(&self, gid: GlyphId, visiting: &mut Vec<GlyphId>) -> Result<usize, Error> {
        if !self.is_composite(gid) {
            self.check_gid(gid)?;
            return Ok(0);
        }
        if visiting.contains(&gid) {
            return Err(Error::ComponentCycle(self.display_name(gid)));
        }
        visiting.push(gid);
        let mut depth = 0;
        for component in self.components(gid)? {
            depth = depth.max(self.depth(component.glyph, visiting)? + 1);
        }
        visiting.pop();
        Ok(depth)
    }

    fn component_ref(&self, parent: GlyphId, component: &Component) -> Result<ComponentRef, Error> {
        let (dx, dy) = match component.anchor {
            Anchor::Offset { x, y } => (x as f64, y as f64),
            Anchor::Point { .. } => {
                return Err(Error::Unsupported(format!(
                    "glyph '{}' positions a component by point matching",
                    self.display_name(parent)
                )))
            }
        };
        let t = &component.transform;
        let [xx, yx, xy, yy] = [t.xx, t.yx, t.xy, t.yy].map(|v| v.to_f32() as f64);
        let linear = Affine::new([xx, yx, xy, yy, 0.0, 0.0]);
        // a scaled offset is transformed along with the outline
        let offset = match component.flags.scaled_component_offset {
            true => linear * kurbo::Point::new(dx, dy),
            false => kurbo::Point::new(dx, dy),
        };
        Ok(ComponentRef {
            glyph: component.glyph.into(),
            transform: Affine::new([xx, yx, xy, yy, offset.x, offset.y]),
        })
    }

    /// Visit every simple glyph that contributes to `gid`, with the
    /// transform that places it.
    fn walk_glyf(
        &self,
        gid: GlyphId,
        transform: Affine,
        decompose: bool,
        visiting: &mut Vec<GlyphId>,
        visit: &mut dyn FnMut(&SimpleGlyph, Affine),
    ) -> Result<(), Error> {
        let ix = self.check_gid(gid)?;
        let Outlines::Glyf(glyphs) = &self.outlines else {
            return Ok(());
        };
        match &glyphs[ix] {
            Glyph::Empty => Ok(()),
            Glyph::Simple(simple) => {
                visit(simple, transform);
                Ok(())
            }
            Glyph::Composite(composite) => {
                if !decompose {
                    return Ok(());
                }
                if visiting.contains(&gid) {
                    return Err(Error::ComponentCycle(self.display_name(gid)));
                }
                visiting.push(gid);
                for component in composite.components() {
                    let component = self.component_ref(gid, component)?;
                    self.walk_glyf(
                        component.glyph,
                        transform * component.transform,
                        decompose,
                        visiting,
                        visit,
                    )?;
                }
                visiting.pop();
                Ok(())
            }
        }
    }
}
