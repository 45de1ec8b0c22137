//! Errors that occur while correcting or converting outlines

use write_fonts::read::ReadError;
use write_fonts::BuilderError;

use crate::cff::CffError;
use crate::convert::ConversionError;
use crate::simplify::GeometryError;
use crate::ModifiedSet;

/// An error produced while processing the glyphs of a font.
#[derive(Debug)]
pub enum Error {
    /// A glyph name or id that is not in the font.
    GlyphNotFound(String),
    /// A composite glyph that (indirectly) references itself.
    ComponentCycle(String),
    /// An operation that requires a composite glyph was given a simple one.
    NotComposite(String),
    /// The path simplifier failed, even after rounding coordinates.
    Geometry {
        glyph: String,
        source: GeometryError,
    },
    /// Every curve conversion strategy failed for this glyph.
    Conversion {
        glyph: String,
        source: ConversionError,
    },
    /// Malformed charstring or CFF table data.
    Cff(CffError),
    /// An outline could not be written to a glyf glyph.
    MalformedPath { glyph: String, reason: String },
    /// The source font uses a feature this crate cannot represent.
    Unsupported(String),
    Read(ReadError),
    Build(BuilderError),
    /// A table failed validation while being compiled.
    Write(write_fonts::error::Error),
}

impl Error {
    /// `true` for errors that abort a batch even when errors are ignored.
    ///
    /// These indicate a bug in the caller or a broken font rather than a
    /// geometric problem with an individual glyph.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::GlyphNotFound(_) | Error::ComponentCycle(_))
    }

    /// The glyph this error is attributed to, if any.
    pub fn glyph_name(&self) -> Option<&str> {
        match self {
            Error::GlyphNotFound(glyph)
            | Error::ComponentCycle(glyph)
            | Error::NotComposite(glyph)
            | Error::Geometry { glyph, .. }
            | Error::Conversion { glyph, .. }
            | Error::MalformedPath { glyph, .. } => Some(glyph),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::GlyphNotFound(glyph) => write!(f, "glyph '{glyph}' not found"),
            Error::ComponentCycle(glyph) => {
                write!(f, "glyph '{glyph}' has a cyclic component reference")
            }
            Error::NotComposite(glyph) => write!(f, "glyph '{glyph}' is not a composite"),
            Error::Geometry { glyph, source } => {
                write!(f, "failed to correct contours of glyph '{glyph}': {source}")
            }
            Error::Conversion { glyph, source } => {
                write!(f, "failed to convert curves of glyph '{glyph}': {source}")
            }
            Error::Cff(error) => write!(f, "CFF error: {error}"),
            Error::MalformedPath { glyph, reason } => {
                write!(f, "glyph '{glyph}' cannot be written: {reason}")
            }
            Error::Unsupported(what) => write!(f, "unsupported font: {what}"),
            Error::Read(error) => write!(f, "failed to read font: {error}"),
            Error::Build(error) => write!(f, "failed to write font: {error}"),
            Error::Write(error) => write!(f, "failed to compile table: {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Geometry { source, .. } => Some(source),
            Error::Conversion { source, .. } => Some(source),
            Error::Cff(error) => Some(error),
            Error::Read(error) => Some(error),
            Error::Build(error) => Some(error),
            Error::Write(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ReadError> for Error {
    fn from(value: ReadError) -> Self {
        Error::Read(value)
    }
}

impl From<BuilderError> for Error {
    fn from(value: BuilderError) -> Self {
        Error::Build(value)
    }
}

impl From<write_fonts::error::Error> for Error {
    fn from(value: write_fonts::error::Error) -> Self {
        Error::Write(value)
    }
}

impl From<CffError> for Error {
    fn from(value: CffError) -> Self {
        Error::Cff(value)
    }
}

/// A batch that stopped at its first failing glyph.
///
/// Glyphs committed before the failure stay committed; `modified` lists them.
#[derive(Debug)]
pub struct BatchError {
    pub error: Error,
    pub modified: ModifiedSet,
}

impl BatchError {
    pub(crate) fn new(error: Error, modified: ModifiedSet) -> Self {
        Self { error, modified }
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} glyphs modified before the failure)",
            self.error,
            self.modified.len()
        )
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
