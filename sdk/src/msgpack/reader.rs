use crate::{
    error::{Error, Format, Result},
    wire::{Scalar, Seq, Wire, WireReader},
};
use keel_schema::{marker, ByteBuffer, Eof};

use std::borrow::Cow;

/// Pull parser over one or more MessagePack values held in memory.
/// Strings and binaries are borrowed from the input.
pub(crate) struct MsgpackReader<'de> {
    bb: ByteBuffer<'de>,
}

impl<'de> MsgpackReader<'de> {
    pub fn new(input: &'de [u8]) -> MsgpackReader<'de> {
        MsgpackReader::at(input, 0)
    }

    pub fn at(input: &'de [u8], pos: usize) -> MsgpackReader<'de> {
        let mut bb = ByteBuffer::new(input);
        bb.set_index(pos);
        MsgpackReader { bb }
    }

    fn error_at(&self, message: impl Into<String>, offset: usize) -> Error {
        Error::malformed(Format::MsgPack, message, offset)
    }

    fn eof(&self) -> Error {
        self.error_at("unexpected end of input", self.bb.data().len())
    }

    fn check<T>(&self, read: std::result::Result<T, Eof>) -> Result<T> {
        read.map_err(|_| self.eof())
    }

    fn byte(&mut self) -> Result<u8> {
        let read = self.bb.read_byte();
        self.check(read)
    }

    fn len8(&mut self) -> Result<usize> {
        self.byte().map(usize::from)
    }

    fn len16(&mut self) -> Result<usize> {
        let read = self.bb.read_u16();
        self.check(read).map(usize::from)
    }

    fn len32(&mut self) -> Result<usize> {
        let read = self.bb.read_u32();
        self.check(read).map(|len| len as usize)
    }

    fn bytes(&mut self, len: usize) -> Result<&'de [u8]> {
        let read = self.bb.read_bytes(len);
        self.check(read)
    }

    fn invalid_marker(&self, byte: u8, offset: usize) -> Error {
        self.error_at(format!("invalid marker 0x{:02x}", byte), offset)
    }

    fn str(&mut self, len: usize) -> Result<Cow<'de, str>> {
        let start = self.bb.index();
        let bytes = self.bytes(len)?;
        std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| self.error_at("invalid UTF-8", start + e.valid_up_to()))
    }

    fn ext(&mut self, len: usize) -> Result<Scalar<'de>> {
        let read = self.bb.read_i8();
        let code = self.check(read)?;
        let data = self.bytes(len)?;
        Ok(Scalar::Ext(code, Cow::Borrowed(data)))
    }

    /// Reads a container header, returning its length and whether it is a map.
    fn header(&mut self) -> Result<Option<(usize, bool)>> {
        let start = self.bb.index();
        let byte = self.byte()?;
        let header = match byte {
            0x80..=0x8f => (usize::from(byte & 0x0f), true),
            0x90..=0x9f => (usize::from(byte & 0x0f), false),
            marker::ARRAY16 => (self.len16()?, false),
            marker::ARRAY32 => (self.len32()?, false),
            marker::MAP16 => (self.len16()?, true),
            marker::MAP32 => (self.len32()?, true),
            _ => {
                self.bb.set_index(start);
                return Ok(None);
            }
        };
        Ok(Some(header))
    }

    fn container(&mut self, map: bool) -> Result<Seq> {
        let start = self.bb.index();
        let read = self.bb.peek_byte();
        let byte = self.check(read)?;
        match self.header()? {
            Some((len, is_map)) if is_map == map => Ok(Seq::counted(len, map)),
            _ => {
                self.bb.set_index(start);
                let expected = if map { "a map" } else { "an array" };
                Err(self.error_at(format!("expected {}, found marker 0x{:02x}", expected, byte), start))
            }
        }
    }
}

impl<'de> WireReader<'de> for MsgpackReader<'de> {
    const FORMAT: Format = Format::MsgPack;

    type Mark = usize;

    fn offset(&self) -> usize {
        self.bb.index()
    }

    fn mark(&self) -> usize {
        self.bb.index()
    }

    fn reset(&mut self, mark: usize) {
        self.bb.set_index(mark);
    }

    fn peek(&mut self) -> Result<Wire> {
        let read = self.bb.peek_byte();
        let byte = self.check(read)?;
        Ok(match byte {
            0x00..=0x7f | 0xe0..=0xff => Wire::Int,
            0x80..=0x8f | marker::MAP16 | marker::MAP32 => Wire::Map,
            0x90..=0x9f | marker::ARRAY16 | marker::ARRAY32 => Wire::Array,
            0xa0..=0xbf | marker::STR8 | marker::STR16 | marker::STR32 => Wire::Str,
            marker::NIL => Wire::Null,
            marker::FALSE | marker::TRUE => Wire::Bool,
            marker::BIN8 | marker::BIN16 | marker::BIN32 => Wire::Bytes,
            marker::EXT8 | marker::EXT16 | marker::EXT32 => Wire::Ext,
            marker::FIXEXT1..=marker::FIXEXT16 => Wire::Ext,
            marker::FLOAT32 | marker::FLOAT64 => Wire::Float,
            marker::UINT8..=marker::INT64 => Wire::Int,
            other => return Err(self.invalid_marker(other, self.bb.index())),
        })
    }

    fn scalar(&mut self, float: bool) -> Result<Scalar<'de>> {
        let start = self.bb.index();
        let byte = self.byte()?;
        let scalar = match byte {
            0x00..=0x7f => Scalar::Int(i64::from(byte)),
            0xe0..=0xff => Scalar::Int(i64::from(byte as i8)),
            0xa0..=0xbf => Scalar::Str(self.str(usize::from(byte & 0x1f))?),
            marker::NIL => Scalar::Null,
            marker::FALSE => Scalar::Bool(false),
            marker::TRUE => Scalar::Bool(true),
            marker::STR8 => {
                let len = self.len8()?;
                Scalar::Str(self.str(len)?)
            }
            marker::STR16 => {
                let len = self.len16()?;
                Scalar::Str(self.str(len)?)
            }
            marker::STR32 => {
                let len = self.len32()?;
                Scalar::Str(self.str(len)?)
            }
            marker::BIN8 => {
                let len = self.len8()?;
                Scalar::Bytes(Cow::Borrowed(self.bytes(len)?))
            }
            marker::BIN16 => {
                let len = self.len16()?;
                Scalar::Bytes(Cow::Borrowed(self.bytes(len)?))
            }
            marker::BIN32 => {
                let len = self.len32()?;
                Scalar::Bytes(Cow::Borrowed(self.bytes(len)?))
            }
            marker::FLOAT32 => {
                let read = self.bb.read_f32();
                Scalar::Float(f64::from(self.check(read)?))
            }
            marker::FLOAT64 => {
                let read = self.bb.read_f64();
                Scalar::Float(self.check(read)?)
            }
            marker::UINT8 => Scalar::Int(i64::from(self.byte()?)),
            marker::UINT16 => {
                let read = self.bb.read_u16();
                Scalar::Int(i64::from(self.check(read)?))
            }
            marker::UINT32 => {
                let read = self.bb.read_u32();
                Scalar::Int(i64::from(self.check(read)?))
            }
            marker::UINT64 => {
                let read = self.bb.read_u64();
                let value = self.check(read)?;
                i64::try_from(value).map_or(Scalar::UInt(value), Scalar::Int)
            }
            marker::INT8 => {
                let read = self.bb.read_i8();
                Scalar::Int(i64::from(self.check(read)?))
            }
            marker::INT16 => {
                let read = self.bb.read_i16();
                Scalar::Int(i64::from(self.check(read)?))
            }
            marker::INT32 => {
                let read = self.bb.read_i32();
                Scalar::Int(i64::from(self.check(read)?))
            }
            marker::INT64 => {
                let read = self.bb.read_i64();
                Scalar::Int(self.check(read)?)
            }
            marker::FIXEXT1 => self.ext(1)?,
            marker::FIXEXT2 => self.ext(2)?,
            marker::FIXEXT4 => self.ext(4)?,
            marker::FIXEXT8 => self.ext(8)?,
            marker::FIXEXT16 => self.ext(16)?,
            marker::EXT8 => {
                let len = self.len8()?;
                self.ext(len)?
            }
            marker::EXT16 => {
                let len = self.len16()?;
                self.ext(len)?
            }
            marker::EXT32 => {
                let len = self.len32()?;
                self.ext(len)?
            }
            other => {
                let error = match other {
                    0x80..=0x9f | marker::ARRAY16..=marker::MAP32 => {
                        self.error_at(format!("expected a scalar, found marker 0x{:02x}", other), start)
                    }
                    _ => self.invalid_marker(other, start),
                };
                return Err(error);
            }
        };
        Ok(match scalar {
            Scalar::Int(i) if float => Scalar::Float(i as f64),
            Scalar::UInt(u) if float => Scalar::Float(u as f64),
            other => other,
        })
    }

    fn begin_array(&mut self) -> Result<Seq> {
        self.container(false)
    }

    fn begin_map(&mut self) -> Result<Seq> {
        self.container(true)
    }

    fn next(&mut self, seq: &mut Seq) -> Result<bool> {
        seq.started = true;
        match seq.remaining {
            Some(0) | None => Ok(false),
            Some(n) => {
                seq.remaining = Some(n - 1);
                Ok(true)
            }
        }
    }

    fn key_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn skip(&mut self) -> Result<()> {
        // Values still to skip, counting both halves of map entries.
        let mut pending: usize = 1;
        while pending > 0 {
            pending -= 1;
            match self.header()? {
                Some((len, map)) => {
                    let values = if map { len.checked_mul(2) } else { Some(len) };
                    pending = values
                        .and_then(|values| pending.checked_add(values))
                        .ok_or_else(|| self.error_at("container too large", self.bb.index()))?;
                }
                None => {
                    self.scalar(false)?;
                }
            }
        }
        Ok(())
    }

    fn raw(&mut self) -> Result<Option<&'de [u8]>> {
        let start = self.bb.index();
        self.skip()?;
        Ok(Some(&self.bb.data()[start..self.bb.index()]))
    }

    fn finish(&mut self) -> Result<()> {
        if self.bb.remaining() > 0 {
            return Err(self.error_at("trailing bytes", self.bb.index()));
        }
        Ok(())
    }

    fn str_keys(&self) -> bool {
        false
    }

    fn bytes_as_str(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        let mut reader = MsgpackReader::new(&[0x05, 0xff, 0xcc, 0xc8, 0xd1, 0xff, 0x00, 0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(reader.scalar(false).unwrap(), Scalar::Int(5));
        assert_eq!(reader.scalar(false).unwrap(), Scalar::Int(-1));
        assert_eq!(reader.scalar(false).unwrap(), Scalar::Int(200));
        assert_eq!(reader.scalar(false).unwrap(), Scalar::Int(-256));
        assert_eq!(reader.scalar(false).unwrap(), Scalar::UInt(u64::MAX));
        reader.finish().unwrap();
    }

    #[test]
    fn strings_borrow() {
        let input = [0xa3, b'a', b'b', b'c', 0xc4, 0x02, 1, 2];
        let mut reader = MsgpackReader::new(&input);
        assert_eq!(reader.scalar(false).unwrap(), Scalar::Str(Cow::Borrowed("abc")));
        match reader.scalar(false).unwrap() {
            Scalar::Bytes(Cow::Borrowed(b)) => assert_eq!(b, &[1, 2]),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn malformed() {
        let err = MsgpackReader::new(&[0xa3, b'a']).scalar(false).unwrap_err();
        assert_eq!(err.to_string(), "MessagePack is malformed: unexpected end of input (byte 2)");
        let err = MsgpackReader::new(&[0xc1]).peek().unwrap_err();
        assert_eq!(err.to_string(), "MessagePack is malformed: invalid marker 0xc1 (byte 0)");
        let err = MsgpackReader::new(&[0xa1, b'k']).begin_map().unwrap_err();
        assert_eq!(err.to_string(), "MessagePack is malformed: expected a map, found marker 0xa1 (byte 0)");
    }

    #[test]
    fn skip_nested() {
        // {"a": [1, {"b": nil}]} followed by 7
        let input = [0x81, 0xa1, b'a', 0x92, 0x01, 0x81, 0xa1, b'b', 0xc0, 0x07];
        let mut reader = MsgpackReader::new(&input);
        assert_eq!(reader.raw().unwrap().unwrap().len(), 9);
        assert_eq!(reader.scalar(false).unwrap(), Scalar::Int(7));
        reader.finish().unwrap();
    }
}
