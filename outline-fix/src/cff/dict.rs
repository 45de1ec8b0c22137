//! Raw DICT and INDEX data.
//!
//! Dictionaries are carried over from the source table byte for byte, minus
//! the entries that point into data this crate rewrites. See "Table 9 Top
//! DICT Operator Entries" at
//! <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=15>

use super::CffError;

/// A DICT operator. Two byte operators are `1200 + second byte`.
pub(crate) type Op = u16;

pub(crate) const VERSION: Op = 0;
pub(crate) const FULL_NAME: Op = 2;
pub(crate) const FAMILY_NAME: Op = 3;
pub(crate) const FONT_BBOX: Op = 5;
pub(crate) const CHARSET: Op = 15;
pub(crate) const ENCODING: Op = 16;
pub(crate) const CHARSTRINGS: Op = 17;
pub(crate) const PRIVATE: Op = 18;
pub(crate) const SUBRS: Op = 19;
pub(crate) const DEFAULT_WIDTH_X: Op = 20;
pub(crate) const NOMINAL_WIDTH_X: Op = 21;
pub(crate) const IS_FIXED_PITCH: Op = 1201;
pub(crate) const ITALIC_ANGLE: Op = 1202;
pub(crate) const UNDERLINE_POSITION: Op = 1203;
pub(crate) const UNDERLINE_THICKNESS: Op = 1204;

const ESCAPE: u8 = 12;

/// Split DICT data into entries, each with the raw bytes of its operands.
pub(crate) fn raw_entries(data: &[u8]) -> Result<Vec<(Op, &[u8])>, CffError> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < data.len() {
        let b0 = data[pos];
        match b0 {
            ESCAPE => {
                let b1 = *data.get(pos + 1).ok_or(CffError::TruncatedDict)?;
                entries.push((1200 + b1 as Op, &data[start..pos]));
                pos += 2;
                start = pos;
            }
            0..=21 => {
                entries.push((b0 as Op, &data[start..pos]));
                pos += 1;
                start = pos;
            }
            28 => pos += 3,
            29 => pos += 5,
            30 => {
                pos += 1;
                loop {
                    let byte = *data.get(pos).ok_or(CffError::TruncatedDict)?;
                    pos += 1;
                    if byte >> 4 == 0xf || byte & 0xf == 0xf {
                        break;
                    }
                }
            }
            32..=246 => pos += 1,
            247..=254 => pos += 2,
            _ => return Err(CffError::InvalidDictByte(b0)),
        }
    }
    if start != data.len() || pos > data.len() {
        return Err(CffError::TruncatedDict);
    }
    Ok(entries)
}

/// Copy DICT data, leaving out every entry whose operator is in `drop`.
pub(crate) fn filter(data: &[u8], drop: &[Op]) -> Result<Vec<u8>, CffError> {
    let mut writer = DictWriter::default();
    for (op, operands) in raw_entries(data)? {
        if !drop.contains(&op) {
            writer.raw(operands);
            writer.op(op);
        }
    }
    Ok(writer.into_bytes())
}

/// Serializes DICT operands and operators.
#[derive(Clone, Debug, Default)]
pub(crate) struct DictWriter {
    data: Vec<u8>,
}

impl DictWriter {
    pub(crate) fn int(&mut self, value: i32) -> &mut Self {
        match value {
            -1131..=1131 => push_short_int(&mut self.data, value),
            -32768..=32767 => {
                self.data.push(28);
                self.data.extend_from_slice(&(value as i16).to_be_bytes());
            }
            _ => self.fixed_int(value),
        }
        self
    }

    /// An integer that always takes five bytes, so offsets can be patched
    /// without changing the size of the dictionary.
    pub(crate) fn fixed_int(&mut self, value: i32) {
        self.data.push(29);
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// A number, written as an integer when it has no fractional part.
    pub(crate) fn number(&mut self, value: f64) -> &mut Self {
        if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
            return self.int(value as i32);
        }
        // "5 Real Number Encoding", nibbles terminated by 0xf
        let mut nibbles: Vec<u8> = format!("{value}")
            .bytes()
            .filter_map(|byte| match byte {
                b'0'..=b'9' => Some(byte - b'0'),
                b'.' => Some(0xa),
                b'-' => Some(0xe),
                _ => None,
            })
            .collect();
        nibbles.push(0xf);
        if nibbles.len() % 2 == 1 {
            nibbles.push(0xf);
        }
        self.data.push(30);
        self.data
            .extend(nibbles.chunks(2).map(|pair| pair[0] << 4 | pair[1]));
        self
    }

    pub(crate) fn op(&mut self, op: Op) -> &mut Self {
        if op >= 1200 {
            self.data.extend_from_slice(&[ESCAPE, (op - 1200) as u8]);
        } else {
            self.data.push(op as u8);
        }
        self
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// The one and two byte integer forms shared by DICTs and charstrings.
pub(crate) fn push_short_int(out: &mut Vec<u8>, value: i32) {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            out.extend_from_slice(&[(v >> 8) as u8 + 247, (v & 0xff) as u8]);
        }
        _ => {
            let v = -value - 108;
            out.extend_from_slice(&[(v >> 8) as u8 + 251, (v & 0xff) as u8]);
        }
    }
}

/// Serialize a CFF (version 1) INDEX.
pub(crate) fn index<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(items.len() as u16).to_be_bytes());
    if items.is_empty() {
        return out;
    }
    let data_len: usize = items.iter().map(|item| item.as_ref().len()).sum();
    let off_size: u8 = match data_len + 1 {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x10000..=0xff_ffff => 3,
        _ => 4,
    };
    out.push(off_size);
    let mut offset = 1usize;
    let push_offset = |out: &mut Vec<u8>, offset: usize| {
        let bytes = (offset as u32).to_be_bytes();
        out.extend_from_slice(&bytes[4 - off_size as usize..]);
    };
    push_offset(&mut out, offset);
    for item in items {
        offset += item.as_ref().len();
        push_offset(&mut out, offset);
    }
    for item in items {
        out.extend_from_slice(item.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use write_fonts::read::tables::postscript::{dict, Index1};
    use write_fonts::read::{FontData, FontRead};

    use super::*;

    #[test]
    fn integers_read_back() {
        let values = [0, 107, -107, 108, 1131, -108, -1131, 1132, -32768, 32767];
        let mut writer = DictWriter::default();
        for value in values {
            writer.int(value).op(DEFAULT_WIDTH_X);
        }
        let data = writer.into_bytes();
        let read: Vec<_> = dict::entries(&data, None)
            .map(|entry| match entry.unwrap() {
                dict::Entry::DefaultWidthX(value) => value.to_i32(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(read, values);
    }

    #[test]
    fn real_numbers() {
        let mut writer = DictWriter::default();
        writer.number(-12.5).op(ITALIC_ANGLE);
        let data = writer.into_bytes();
        // -12.5 -> e 1 2 a 5 f
        assert_eq!(data, [30, 0xe1, 0x2a, 0x5f, 12, 2]);
        let entries: Vec<_> = dict::entries(&data, None).collect();
        assert!(matches!(
            entries[0],
            Ok(dict::Entry::ItalicAngle(angle)) if angle.to_f64() == -12.5
        ));
    }

    #[test]
    fn filter_drops_entries() {
        let mut writer = DictWriter::default();
        writer.int(391).op(VERSION);
        writer.int(1).int(2).int(3).int(4).op(FONT_BBOX);
        writer.fixed_int(1000);
        writer.op(CHARSTRINGS);
        writer.number(0.5).op(ITALIC_ANGLE);
        let data = writer.into_bytes();
        let entries = raw_entries(&data).unwrap();
        let ops: Vec<_> = entries.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, [VERSION, FONT_BBOX, CHARSTRINGS, ITALIC_ANGLE]);

        let filtered = filter(&data, &[FONT_BBOX, CHARSTRINGS]).unwrap();
        let ops: Vec<_> = raw_entries(&filtered)
            .unwrap()
            .iter()
            .map(|(op, _)| *op)
            .collect();
        assert_eq!(ops, [VERSION, ITALIC_ANGLE]);
    }

    #[test]
    fn malformed_dicts() {
        assert!(matches!(raw_entries(&[29, 0, 0]), Err(CffError::TruncatedDict)));
        assert!(matches!(raw_entries(&[139]), Err(CffError::TruncatedDict)));
        assert!(matches!(raw_entries(&[255, 0]), Err(CffError::InvalidDictByte(255))));
    }

    #[test]
    fn index_round_trip() {
        let items: Vec<Vec<u8>> = vec![b"one".to_vec(), vec![], vec![7; 300]];
        let data = index(&items);
        let read = Index1::read(FontData::new(&data)).unwrap();
        assert_eq!(read.count(), 3);
        assert_eq!(read.get(0).unwrap(), b"one");
        assert_eq!(read.get(1).unwrap(), b"");
        assert_eq!(read.get(2).unwrap().len(), 300);
        assert_eq!(index::<&[u8]>(&[]), [0, 0]);
    }
}
