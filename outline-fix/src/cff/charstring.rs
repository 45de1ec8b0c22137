//! Type 2 charstrings without subroutines or hints.
//!
//! See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf>

use kurbo::Point;
use write_fonts::read::tables::postscript::{
    charstring::{self, CommandSink},
    Index,
};
use write_fonts::types::Fixed;

use super::{dict::push_short_int, CffError};
use crate::outline::{GlyphOutline, OutlineBuilder, Segment};

const RLINETO: u8 = 5;
const RRCURVETO: u8 = 8;
const ENDCHAR: u8 = 14;
const RMOVETO: u8 = 21;

/// "Appendix B Type 2 Charstring Implementation Limits"
const MAX_STACK: usize = 48;

const FIXED_MIN: f64 = i16::MIN as f64;
const FIXED_MAX: f64 = i16::MAX as f64 + 65535.0 / 65536.0;

/// Encode `outline` as a charstring.
///
/// `width` is the advance width minus `nominalWidthX`, or `None` when the
/// advance equals `defaultWidthX`. Quadratic segments are raised to cubics.
///
/// Fails with [`CffError::OperandOutOfRange`] if the width, a coordinate or
/// the distance between two consecutive points does not fit a 16.16 number.
pub fn encode(outline: &GlyphOutline, width: Option<i32>) -> Result<Vec<u8>, CffError> {
    let mut encoder = Encoder::default();
    if let Some(width) = width {
        encoder.push_int(width)?;
    }
    for contour in outline.contours() {
        let mut last = Point::ZERO;
        for segment in contour.segments() {
            match *segment {
                Segment::MoveTo(p) => {
                    encoder.flush();
                    encoder.push_point(p)?;
                    encoder.emit(RMOVETO);
                    last = p;
                }
                Segment::LineTo(p) => {
                    encoder.begin(RLINETO, 2);
                    encoder.push_point(p)?;
                    last = p;
                }
                Segment::QuadTo(c, p) => {
                    encoder.begin(RRCURVETO, 6);
                    encoder.push_point(last + (c - last) * (2.0 / 3.0))?;
                    encoder.push_point(p + (c - p) * (2.0 / 3.0))?;
                    encoder.push_point(p)?;
                    last = p;
                }
                Segment::CubicTo(c0, c1, p) => {
                    encoder.begin(RRCURVETO, 6);
                    encoder.push_point(c0)?;
                    encoder.push_point(c1)?;
                    encoder.push_point(p)?;
                    last = p;
                }
                // the next moveto or endchar closes the path
                Segment::Close => (),
            }
        }
    }
    encoder.flush();
    encoder.emit(ENDCHAR);
    Ok(encoder.data)
}

/// Decode a charstring that does not call subroutines.
pub fn decode(data: &[u8]) -> Result<GlyphOutline, CffError> {
    let mut sink = BuilderSink(OutlineBuilder::new());
    charstring::evaluate(&[], Index::Empty, Index::Empty, None, None, data, &mut sink)?;
    Ok(sink.0.finish())
}

/// Deltas are taken from the previously encoded position so rounding to
/// 16.16 never accumulates.
#[derive(Default)]
struct Encoder {
    data: Vec<u8>,
    x: Fixed,
    y: Fixed,
    pending: Option<u8>,
    args: usize,
}

impl Encoder {
    /// Start (or continue) a run of `op` that takes `arity` arguments.
    fn begin(&mut self, op: u8, arity: usize) {
        if self.pending != Some(op) || self.args + arity > MAX_STACK {
            self.flush();
            self.pending = Some(op);
        }
        self.args += arity;
    }

    fn flush(&mut self) {
        if let Some(op) = self.pending.take() {
            self.emit(op);
        }
    }

    fn emit(&mut self, op: u8) {
        self.data.push(op);
        self.args = 0;
    }

    fn push_point(&mut self, point: Point) -> Result<(), CffError> {
        let x = to_fixed(point.x)?;
        let y = to_fixed(point.y)?;
        self.push_fixed(delta(x, self.x)?);
        self.push_fixed(delta(y, self.y)?);
        self.x = x;
        self.y = y;
        Ok(())
    }

    fn push_fixed(&mut self, value: Fixed) {
        if value.to_bits() & 0xffff == 0 {
            self.push_i16((value.to_bits() >> 16) as i16);
        } else {
            self.data.push(255);
            self.data.extend_from_slice(&value.to_bits().to_be_bytes());
        }
    }

    fn push_int(&mut self, value: i32) -> Result<(), CffError> {
        let value = i16::try_from(value).map_err(|_| CffError::OperandOutOfRange(value as f64))?;
        self.push_i16(value);
        Ok(())
    }

    fn push_i16(&mut self, value: i16) {
        match value {
            -1131..=1131 => push_short_int(&mut self.data, value as i32),
            _ => {
                self.data.push(28);
                self.data.extend_from_slice(&value.to_be_bytes());
            }
        }
    }
}

fn to_fixed(value: f64) -> Result<Fixed, CffError> {
    if !(FIXED_MIN..=FIXED_MAX).contains(&value) {
        return Err(CffError::OperandOutOfRange(value));
    }
    Ok(Fixed::from_f64(value))
}

fn delta(to: Fixed, from: Fixed) -> Result<Fixed, CffError> {
    let bits = to.to_bits() as i64 - from.to_bits() as i64;
    i32::try_from(bits)
        .map(Fixed::from_bits)
        .map_err(|_| CffError::OperandOutOfRange(bits as f64 / 65536.0))
}

struct BuilderSink(OutlineBuilder);

fn point(x: Fixed, y: Fixed) -> Point {
    Point::new(x.to_f64(), y.to_f64())
}

impl CommandSink for BuilderSink {
    fn move_to(&mut self, x: Fixed, y: Fixed) {
        self.0.push(Segment::MoveTo(point(x, y)));
    }

    fn line_to(&mut self, x: Fixed, y: Fixed) {
        self.0.push(Segment::LineTo(point(x, y)));
    }

    fn curve_to(&mut self, cx0: Fixed, cy0: Fixed, cx1: Fixed, cy1: Fixed, x: Fixed, y: Fixed) {
        self.0.push(Segment::CubicTo(
            point(cx0, cy0),
            point(cx1, cy1),
            point(x, y),
        ));
    }

    fn close(&mut self) {
        self.0.push(Segment::Close);
    }
}

/// The width operand of a charstring, if it has one.
///
/// The width is the odd argument out of the first stack clearing operator.
pub fn width(data: &[u8]) -> Result<Option<Fixed>, CffError> {
    let mut args: Vec<Fixed> = Vec::new();
    let mut pos = 0;
    while let Some(&b0) = data.get(pos) {
        pos += 1;
        match b0 {
            28 => {
                let bytes = data.get(pos..pos + 2).ok_or(CffError::TruncatedCharstring)?;
                args.push(Fixed::from_i32(i16::from_be_bytes([bytes[0], bytes[1]]) as i32));
                pos += 2;
            }
            32..=246 => args.push(Fixed::from_i32(b0 as i32 - 139)),
            247..=254 => {
                let b1 = *data.get(pos).ok_or(CffError::TruncatedCharstring)? as i32;
                pos += 1;
                let value = if b0 < 251 {
                    (b0 as i32 - 247) * 256 + b1 + 108
                } else {
                    -(b0 as i32 - 251) * 256 - b1 - 108
                };
                args.push(Fixed::from_i32(value));
            }
            255 => {
                let bytes = data.get(pos..pos + 4).ok_or(CffError::TruncatedCharstring)?;
                args.push(Fixed::from_bits(i32::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])));
                pos += 4;
            }
            // stem hints and moves take an even number of arguments
            1 | 3 | 18 | 23 | 19 | 20 | RMOVETO => {
                return Ok((args.len() % 2 == 1).then(|| args[0]));
            }
            // hmoveto, vmoveto
            4 | 22 => return Ok((args.len() == 2).then(|| args[0])),
            ENDCHAR => return Ok((args.len() == 1 || args.len() == 5).then(|| args[0])),
            _ => return Ok(None),
        }
    }
    Ok(None)
}
