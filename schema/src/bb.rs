use std::fmt;

/// MessagePack format markers.
pub mod marker {
    pub const NIL: u8 = 0xc0;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const EXT8: u8 = 0xc7;
    pub const EXT16: u8 = 0xc8;
    pub const EXT32: u8 = 0xc9;
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const FIXEXT1: u8 = 0xd4;
    pub const FIXEXT2: u8 = 0xd5;
    pub const FIXEXT4: u8 = 0xd6;
    pub const FIXEXT8: u8 = 0xd7;
    pub const FIXEXT16: u8 = 0xd8;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;
    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXSTR: u8 = 0xa0;
    pub const NEG_FIXINT: u8 = 0xe0;
}

/// Returned when a read runs past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eof;

impl fmt::Display for Eof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unexpected end of input")
    }
}

impl std::error::Error for Eof {}

/// Returned when a length does not fit a 32-bit MessagePack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooLong(pub usize);

impl fmt::Display for TooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Length {} is too long for MessagePack", self.0)
    }
}

impl std::error::Error for TooLong {}

/// The header value for a payload or container of `len` items.
pub fn length_header(len: usize) -> Result<u32, TooLong> {
    u32::try_from(len).map_err(|_| TooLong(len))
}

/// A MessagePack byte buffer meant for reading.
///
/// Example usage:
///
/// ```
/// let mut bb = keel_schema::ByteBuffer::new(&[0xcd, 0x01, 0x00, 0xa1, b'x']);
/// assert_eq!(bb.read_byte(), Ok(0xcd));
/// assert_eq!(bb.read_u16(), Ok(256));
/// assert_eq!(bb.read_byte(), Ok(0xa1));
/// assert_eq!(bb.read_bytes(1), Ok(&b"x"[..]));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the read position. Used to rewind after a lookahead.
    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.data.len());
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Returns the byte at the current index without consuming it.
    pub fn peek_byte(&self) -> Result<u8, Eof> {
        self.data.get(self.index).copied().ok_or(Eof)
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, Eof> {
        let value = self.peek_byte()?;
        self.index += 1;
        Ok(value)
    }

    /// Try to read `len` bytes starting at the current index. The slice
    /// aliases the underlying memory.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Eof> {
        if len > self.remaining() {
            Err(Eof)
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Eof> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Big-endian unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16, Eof> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// Big-endian unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32, Eof> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Big-endian unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64, Eof> {
        self.read_array().map(u64::from_be_bytes)
    }

    pub fn read_i8(&mut self) -> Result<i8, Eof> {
        self.read_byte().map(|b| b as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, Eof> {
        self.read_array().map(i16::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, Eof> {
        self.read_array().map(i32::from_be_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64, Eof> {
        self.read_array().map(i64::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32, Eof> {
        self.read_array().map(f32::from_be_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64, Eof> {
        self.read_array().map(f64::from_be_bytes)
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(Eof));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(Eof));
    assert_eq!(read(&[0], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(read(&[0], 2), Err(Eof));

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(Eof));
}

#[test]
fn read_fixed_width() {
    assert_eq!(ByteBuffer::new(&[0x01, 0x02]).read_u16(), Ok(0x0102));
    assert_eq!(ByteBuffer::new(&[0x01]).read_u16(), Err(Eof));
    assert_eq!(
        ByteBuffer::new(&[0xde, 0xad, 0xbe, 0xef]).read_u32(),
        Ok(0xdead_beef)
    );
    assert_eq!(
        ByteBuffer::new(&[0xff; 8]).read_u64(),
        Ok(u64::MAX)
    );
    assert_eq!(ByteBuffer::new(&[0xff]).read_i8(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[0xff, 0x7f]).read_i16(), Ok(-129));
    assert_eq!(ByteBuffer::new(&[0x80, 0, 0, 0]).read_i32(), Ok(i32::MIN));
    assert_eq!(
        ByteBuffer::new(&[0x80, 0, 0, 0, 0, 0, 0, 0]).read_i64(),
        Ok(i64::MIN)
    );
    assert_eq!(ByteBuffer::new(&[0x3f, 0x00, 0x00, 0x00]).read_f32(), Ok(0.5));
    assert_eq!(
        ByteBuffer::new(&[0xc0, 0x5e, 0xdd, 0x2f, 0x1a, 0x9f, 0xbe, 0x77]).read_f64(),
        Ok(-123.456)
    );
}

#[test]
fn read_sequence() {
    let mut bb = ByteBuffer::new(&[0xcc, 0xff, 0xd1, 0xff, 0x00, 0xa2, b'h', b'i']);
    assert_eq!(bb.read_byte(), Ok(marker::UINT8));
    assert_eq!(bb.read_byte(), Ok(255));
    assert_eq!(bb.read_byte(), Ok(marker::INT16));
    assert_eq!(bb.read_i16(), Ok(-256));
    assert_eq!(bb.peek_byte(), Ok(0xa2));
    let mark = bb.index();
    assert_eq!(bb.read_byte(), Ok(0xa2));
    bb.set_index(mark);
    assert_eq!(bb.read_byte(), Ok(0xa2));
    assert_eq!(bb.read_bytes(2), Ok(&b"hi"[..]));
    assert_eq!(bb.remaining(), 0);
}

/// A MessagePack byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = keel_schema::ByteBufferMut::new();
/// bb.write_str("🍕").unwrap();
/// bb.write_uint(300);
/// assert_eq!(bb.data(), [0xa4, 240, 159, 141, 149, 0xcd, 0x01, 0x2c]);
/// ```
///
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Continues writing at the end of an existing vector.
    pub fn from_vec(data: Vec<u8>) -> ByteBufferMut {
        ByteBufferMut { data }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_nil(&mut self) {
        self.write_byte(marker::NIL);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(if value { marker::TRUE } else { marker::FALSE });
    }

    /// Write an unsigned integer using the smallest encoding that holds it.
    pub fn write_uint(&mut self, value: u64) {
        if value < 128 {
            self.write_byte(value as u8);
        } else if value <= u8::MAX as u64 {
            self.write_byte(marker::UINT8);
            self.write_byte(value as u8);
        } else if value <= u16::MAX as u64 {
            self.write_byte(marker::UINT16);
            self.write_bytes(&(value as u16).to_be_bytes());
        } else if value <= u32::MAX as u64 {
            self.write_byte(marker::UINT32);
            self.write_bytes(&(value as u32).to_be_bytes());
        } else {
            self.write_byte(marker::UINT64);
            self.write_bytes(&value.to_be_bytes());
        }
    }

    /// Write a signed integer using the smallest encoding that holds it.
    /// Non-negative values use the unsigned forms.
    pub fn write_int(&mut self, value: i64) {
        if value >= 0 {
            self.write_uint(value as u64);
        } else if value >= -32 {
            self.write_byte(value as i8 as u8);
        } else if value >= i8::MIN as i64 {
            self.write_byte(marker::INT8);
            self.write_byte(value as i8 as u8);
        } else if value >= i16::MIN as i64 {
            self.write_byte(marker::INT16);
            self.write_bytes(&(value as i16).to_be_bytes());
        } else if value >= i32::MIN as i64 {
            self.write_byte(marker::INT32);
            self.write_bytes(&(value as i32).to_be_bytes());
        } else {
            self.write_byte(marker::INT64);
            self.write_bytes(&value.to_be_bytes());
        }
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_byte(marker::FLOAT64);
        self.write_bytes(&value.to_be_bytes());
    }

    /// Write a UTF-8 string with its length header.
    pub fn write_str(&mut self, value: &str) -> Result<(), TooLong> {
        let len = length_header(value.len())?;
        if len < 32 {
            self.write_byte(marker::FIXSTR | len as u8);
        } else if len <= u8::MAX as u32 {
            self.write_byte(marker::STR8);
            self.write_byte(len as u8);
        } else if len <= u16::MAX as u32 {
            self.write_byte(marker::STR16);
            self.write_bytes(&(len as u16).to_be_bytes());
        } else {
            self.write_byte(marker::STR32);
            self.write_bytes(&len.to_be_bytes());
        }
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Write a binary blob with its length header.
    pub fn write_bin(&mut self, value: &[u8]) -> Result<(), TooLong> {
        let len = length_header(value.len())?;
        if len <= u8::MAX as u32 {
            self.write_byte(marker::BIN8);
            self.write_byte(len as u8);
        } else if len <= u16::MAX as u32 {
            self.write_byte(marker::BIN16);
            self.write_bytes(&(len as u16).to_be_bytes());
        } else {
            self.write_byte(marker::BIN32);
            self.write_bytes(&len.to_be_bytes());
        }
        self.write_bytes(value);
        Ok(())
    }

    pub fn write_array_len(&mut self, len: u32) {
        if len < 16 {
            self.write_byte(marker::FIXARRAY | len as u8);
        } else if len <= u16::MAX as u32 {
            self.write_byte(marker::ARRAY16);
            self.write_bytes(&(len as u16).to_be_bytes());
        } else {
            self.write_byte(marker::ARRAY32);
            self.write_bytes(&len.to_be_bytes());
        }
    }

    pub fn write_map_len(&mut self, len: u32) {
        if len < 16 {
            self.write_byte(marker::FIXMAP | len as u8);
        } else if len <= u16::MAX as u32 {
            self.write_byte(marker::MAP16);
            self.write_bytes(&(len as u16).to_be_bytes());
        } else {
            self.write_byte(marker::MAP32);
            self.write_bytes(&len.to_be_bytes());
        }
    }

    /// Write an extension value. Payloads of 1, 2, 4, 8 and 16 bytes use the
    /// fixext forms.
    pub fn write_ext(&mut self, code: i8, payload: &[u8]) -> Result<(), TooLong> {
        let len = length_header(payload.len())?;
        match len {
            1 => self.write_byte(marker::FIXEXT1),
            2 => self.write_byte(marker::FIXEXT2),
            4 => self.write_byte(marker::FIXEXT4),
            8 => self.write_byte(marker::FIXEXT8),
            16 => self.write_byte(marker::FIXEXT16),
            _ if len <= u8::MAX as u32 => {
                self.write_byte(marker::EXT8);
                self.write_byte(len as u8);
            }
            _ if len <= u16::MAX as u32 => {
                self.write_byte(marker::EXT16);
                self.write_bytes(&(len as u16).to_be_bytes());
            }
            _ => {
                self.write_byte(marker::EXT32);
                self.write_bytes(&len.to_be_bytes());
            }
        }
        self.write_byte(code as u8);
        self.write_bytes(payload);
        Ok(())
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_bool() {
    assert_eq!(write_once(|bb| bb.write_bool(false)), [0xc2]);
    assert_eq!(write_once(|bb| bb.write_bool(true)), [0xc3]);
    assert_eq!(write_once(|bb| bb.write_nil()), [0xc0]);
}

#[test]
fn write_bytes() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&[1, 2, 3]);
    bb.write_bytes(&[]);
    bb.write_bytes(&[4, 5]);
    assert_eq!(bb.data(), [1, 2, 3, 4, 5]);
}

#[test]
fn write_uint() {
    assert_eq!(write_once(|bb| bb.write_uint(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_uint(127)), [127]);
    assert_eq!(write_once(|bb| bb.write_uint(128)), [0xcc, 128]);
    assert_eq!(write_once(|bb| bb.write_uint(255)), [0xcc, 255]);
    assert_eq!(write_once(|bb| bb.write_uint(256)), [0xcd, 1, 0]);
    assert_eq!(write_once(|bb| bb.write_uint(65535)), [0xcd, 255, 255]);
    assert_eq!(write_once(|bb| bb.write_uint(65536)), [0xce, 0, 1, 0, 0]);
    assert_eq!(
        write_once(|bb| bb.write_uint(4294967296)),
        [0xcf, 0, 0, 0, 1, 0, 0, 0, 0]
    );
    assert_eq!(
        write_once(|bb| bb.write_uint(u64::MAX)),
        [0xcf, 255, 255, 255, 255, 255, 255, 255, 255]
    );
}

#[test]
fn write_int() {
    assert_eq!(write_once(|bb| bb.write_int(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_int(200)), [0xcc, 200]);
    assert_eq!(write_once(|bb| bb.write_int(-1)), [0xff]);
    assert_eq!(write_once(|bb| bb.write_int(-32)), [0xe0]);
    assert_eq!(write_once(|bb| bb.write_int(-33)), [0xd0, 0xdf]);
    assert_eq!(write_once(|bb| bb.write_int(-128)), [0xd0, 0x80]);
    assert_eq!(write_once(|bb| bb.write_int(-129)), [0xd1, 0xff, 0x7f]);
    assert_eq!(
        write_once(|bb| bb.write_int(-32769)),
        [0xd2, 0xff, 0xff, 0x7f, 0xff]
    );
    assert_eq!(
        write_once(|bb| bb.write_int(i64::MIN)),
        [0xd3, 0x80, 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn write_f64() {
    assert_eq!(
        write_once(|bb| bb.write_f64(-123.456)),
        [0xcb, 0xc0, 0x5e, 0xdd, 0x2f, 0x1a, 0x9f, 0xbe, 0x77]
    );
}

#[test]
fn write_str() {
    assert_eq!(write_once(|bb| bb.write_str("").unwrap()), [0xa0]);
    assert_eq!(write_once(|bb| bb.write_str("abc").unwrap()), [0xa3, 97, 98, 99]);
    assert_eq!(
        write_once(|bb| bb.write_str("🍕").unwrap()),
        [0xa4, 240, 159, 141, 149]
    );

    let long = "x".repeat(32);
    let mut bb = ByteBufferMut::new();
    bb.write_str(&long).unwrap();
    assert_eq!(&bb.data()[..2], [0xd9, 32]);

    let longer = "x".repeat(256);
    let mut bb = ByteBufferMut::new();
    bb.write_str(&longer).unwrap();
    assert_eq!(&bb.data()[..3], [0xda, 1, 0]);
}

#[test]
fn write_bin() {
    assert_eq!(write_once(|bb| bb.write_bin(&[]).unwrap()), [0xc4, 0]);
    assert_eq!(write_once(|bb| bb.write_bin(&[7, 8]).unwrap()), [0xc4, 2, 7, 8]);
}

#[test]
fn write_headers() {
    assert_eq!(write_once(|bb| bb.write_array_len(0)), [0x90]);
    assert_eq!(write_once(|bb| bb.write_array_len(15)), [0x9f]);
    assert_eq!(write_once(|bb| bb.write_array_len(16)), [0xdc, 0, 16]);
    assert_eq!(
        write_once(|bb| bb.write_array_len(65536)),
        [0xdd, 0, 1, 0, 0]
    );
    assert_eq!(write_once(|bb| bb.write_map_len(1)), [0x81]);
    assert_eq!(write_once(|bb| bb.write_map_len(16)), [0xde, 0, 16]);
}

#[test]
fn write_ext() {
    assert_eq!(write_once(|bb| bb.write_ext(5, &[1]).unwrap()), [0xd4, 5, 1]);
    assert_eq!(
        write_once(|bb| bb.write_ext(-1, &[0, 0, 0, 1]).unwrap()),
        [0xd6, 0xff, 0, 0, 0, 1]
    );
    assert_eq!(
        write_once(|bb| bb.write_ext(3, &[9, 9, 9]).unwrap()),
        [0xc7, 3, 3, 9, 9, 9]
    );
}

#[test]
fn length_headers() {
    assert_eq!(length_header(0), Ok(0));
    assert_eq!(length_header(u32::MAX as usize), Ok(u32::MAX));
    #[cfg(target_pointer_width = "64")]
    {
        let over = u32::MAX as usize + 1;
        assert_eq!(length_header(over), Err(TooLong(over)));
        assert_eq!(TooLong(over).to_string(), "Length 4294967296 is too long for MessagePack");
    }
}
