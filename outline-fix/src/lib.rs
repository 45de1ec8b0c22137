//! Contour correction and curve basis conversion for OpenType fonts.
//!
//! This crate repairs glyph outlines (overlapping contours, wrong winding
//! direction, degenerate micro-contours, overlapping composite components)
//! and converts outlines between the quadratic curves of the `glyf` table
//! and the cubic curves of the `CFF ` table.
//!
//! The entry point is [`OutlineFont`], an in-memory model of a font's
//! outlines and horizontal metrics:
//!
//! ```no_run
//! use outline_fix::{ContourOptions, OutlineFont, WindingSimplifier};
//!
//! let data = std::fs::read("MyFont.ttf").unwrap();
//! let mut font = OutlineFont::new(&data).unwrap();
//! let report = font
//!     .correct_contours(&ContourOptions::default(), &WindingSimplifier::default())
//!     .unwrap();
//! if report.needs_save() {
//!     std::fs::write("MyFont.fixed.ttf", font.build(&data).unwrap()).unwrap();
//! }
//! ```
//!
//! [`OutlineFont::add_extremes`] and [`OutlineFont::check_outlines`] cover
//! the other outline chores fonts need before release.
//!
//! Boolean path operations are not implemented here: they are supplied by a
//! [`PathSimplifier`].

#![forbid(unsafe_code)]

/// Expose our "raw" underlying parser crate.
pub extern crate skrifa;

mod batch;
pub mod cff;
pub mod check;
pub mod convert;
mod error;
pub mod extremes;
mod font;
pub mod normalize;
pub mod outline;
mod overlap;
pub mod quadratic;
pub mod simplify;

pub use batch::{run_batch, BatchPolicy, BatchReport, GlyphState};
pub use check::{GlyphIssues, OutlineIssue};
pub use error::{BatchError, Error};
pub use font::{Metrics, MetricsDelta, OutlineFont, Outlines};
pub use normalize::{normalize, same_outline};
pub use outline::{Contour, GlyphOutline, OutlineFormat, Segment, Winding};
pub use overlap::components_overlap;
pub use simplify::{GeometryError, PathSimplifier, WindingSimplifier};

/// The names of the glyphs changed by an operation, in processing order.
pub type ModifiedSet = indexmap::IndexSet<String>;

/// Options for [`OutlineFont::correct_contours`].
#[derive(Clone, Debug, PartialEq)]
pub struct ContourOptions {
    /// Contours with an absolute area smaller than this are removed; zero
    /// keeps every contour.
    pub min_area: u32,
    /// Strip TrueType instructions and hinting tables.
    pub remove_hinting: bool,
    /// Keep going when a glyph fails, leaving its outline unchanged.
    pub ignore_errors: bool,
    /// Accepted for compatibility. Charstrings are always written without
    /// subroutines, so there is nothing left to remove.
    pub remove_unused_subroutines: bool,
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            min_area: 25,
            remove_hinting: true,
            ignore_errors: false,
            remove_unused_subroutines: true,
        }
    }
}

/// Options for [`OutlineFont::to_cubic`] and [`OutlineFont::to_quadratic`].
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionOptions {
    /// Maximum approximation error, in thousandths of an em.
    pub tolerance: f64,
    /// Run contour correction on each converted outline.
    pub correct_contours: bool,
    /// Keep going when a glyph fails; the glyph is written without contours.
    pub ignore_errors: bool,
}

impl ConversionOptions {
    /// The tolerance in font units for a font with the given units per em.
    pub fn tolerance_in_units(&self, units_per_em: u16) -> f64 {
        self.tolerance * units_per_em as f64 / 1000.0
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            correct_contours: true,
            ignore_errors: false,
        }
    }
}

#[cfg(test)]
mod test_support;
