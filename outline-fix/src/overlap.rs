//! Detecting composite glyphs whose components overlap.

use skrifa::GlyphId;

use crate::font::{ComponentRef, OutlineFont};
use crate::outline::GlyphOutline;
use crate::simplify::PathSimplifier;
use crate::Error;

/// `true` if the filled areas of any two components of `gid` intersect.
///
/// Component outlines are decomposed and placed by their transforms; each is
/// computed at most once, and only when a pair needs it.
pub fn components_overlap<S: PathSimplifier + ?Sized>(
    font: &OutlineFont,
    gid: GlyphId,
    simplifier: &S,
) -> Result<bool, Error> {
    let components = font.components(gid)?;
    if components.len() < 2 {
        return Ok(false);
    }
    let mut cache: Vec<Option<GlyphOutline>> = vec![None; components.len()];
    for i in 0..components.len() {
        for j in i + 1..components.len() {
            placed_outline(font, &components, &mut cache, i)?;
            placed_outline(font, &components, &mut cache, j)?;
            let (Some(a), Some(b)) = (&cache[i], &cache[j]) else {
                continue;
            };
            let hit = simplifier
                .intersects(a, b)
                .map_err(|source| Error::Geometry {
                    glyph: font.display_name(gid),
                    source,
                })?;
            if hit {
                log::debug!(
                    "components {i} and {j} of '{}' overlap",
                    font.display_name(gid)
                );
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn placed_outline(
    font: &OutlineFont,
    components: &[ComponentRef],
    cache: &mut [Option<GlyphOutline>],
    ix: usize,
) -> Result<(), Error> {
    if cache[ix].is_none() {
        let component = &components[ix];
        let outline = font.outline(component.glyph, true)?;
        cache[ix] = Some(outline.transform(component.transform));
    }
    Ok(())
}
