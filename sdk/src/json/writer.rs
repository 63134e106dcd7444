use crate::wire::WireWriter;
use keel_schema::BigInt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Appends compact JSON text to a byte buffer.
pub(crate) struct JsonWriter {
    out: Vec<u8>,
}

impl JsonWriter {
    pub fn new(out: Vec<u8>) -> JsonWriter {
        JsonWriter { out }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }

    fn escaped(&mut self, value: &str) {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        self.out.push(b'"');
        let bytes = value.as_bytes();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let escape: &[u8] = match b {
                b'"' => b"\\\"",
                b'\\' => b"\\\\",
                b'\n' => b"\\n",
                b'\r' => b"\\r",
                b'\t' => b"\\t",
                0x08 => b"\\b",
                0x0c => b"\\f",
                0x00..=0x1f => b"",
                _ => continue,
            };
            self.out.extend_from_slice(&bytes[start..i]);
            if escape.is_empty() {
                self.out.extend_from_slice(b"\\u00");
                self.out.push(HEX[(b >> 4) as usize]);
                self.out.push(HEX[(b & 0xf) as usize]);
            } else {
                self.out.extend_from_slice(escape);
            }
            start = i + 1;
        }
        self.out.extend_from_slice(&bytes[start..]);
        self.out.push(b'"');
    }
}

impl WireWriter for JsonWriter {
    fn str_keys(&self) -> bool {
        true
    }

    fn supports_ext(&self) -> bool {
        false
    }

    fn null(&mut self) {
        self.out.extend_from_slice(b"null");
    }

    fn bool(&mut self, value: bool) {
        self.out
            .extend_from_slice(if value { b"true" } else { b"false" });
    }

    fn int(&mut self, value: i64) {
        self.out
            .extend_from_slice(itoa::Buffer::new().format(value).as_bytes());
    }

    fn uint(&mut self, value: u64) {
        self.out
            .extend_from_slice(itoa::Buffer::new().format(value).as_bytes());
    }

    fn bigint(&mut self, value: &BigInt) -> Result<(), String> {
        self.out.extend_from_slice(value.to_string().as_bytes());
        Ok(())
    }

    /// Non-finite floats have no JSON spelling and are written as `null`.
    fn float(&mut self, value: f64) {
        if value.is_finite() {
            self.out
                .extend_from_slice(ryu::Buffer::new().format_finite(value).as_bytes());
        } else {
            self.null();
        }
    }

    fn str(&mut self, value: &str) -> Result<(), String> {
        self.escaped(value);
        Ok(())
    }

    fn bytes(&mut self, value: &[u8]) -> Result<(), String> {
        self.out.push(b'"');
        self.out.extend_from_slice(BASE64.encode(value).as_bytes());
        self.out.push(b'"');
        Ok(())
    }

    fn ext(&mut self, _code: i8, _data: &[u8]) -> Result<(), String> {
        Err("Extension types can't be encoded as JSON".to_owned())
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> Result<(), String> {
        self.out.push(b'[');
        Ok(())
    }

    fn item(&mut self, index: usize) {
        if index > 0 {
            self.out.push(b',');
        }
    }

    fn end_array(&mut self) {
        self.out.push(b']');
    }

    fn begin_map(&mut self, _len: usize) -> Result<(), String> {
        self.out.push(b'{');
        Ok(())
    }

    fn key(&mut self, index: usize) {
        if index > 0 {
            self.out.push(b',');
        }
    }

    fn value(&mut self) {
        self.out.push(b':');
    }

    fn end_map(&mut self) {
        self.out.push(b'}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(write: impl FnOnce(&mut JsonWriter)) -> String {
        let mut writer = JsonWriter::new(Vec::new());
        write(&mut writer);
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn escapes() {
        assert_eq!(text(|w| w.str("a\"b\\c\nd\u{1}é").unwrap()), r#""a\"b\\c\nd\u0001é""#);
        assert_eq!(text(|w| w.str("").unwrap()), r#""""#);
    }

    #[test]
    fn numbers() {
        assert_eq!(text(|w| w.float(1.0)), "1.0");
        assert_eq!(text(|w| w.float(f64::NAN)), "null");
        assert_eq!(text(|w| w.uint(u64::MAX)), "18446744073709551615");
        let big = BigInt::parse("-123456789012345678901234567890").unwrap();
        assert_eq!(text(|w| w.bigint(&big).unwrap()), "-123456789012345678901234567890");
    }

    #[test]
    fn containers() {
        let out = text(|w| {
            w.begin_map(2).unwrap();
            w.key(0);
            w.str("a").unwrap();
            w.value();
            w.begin_array(2).unwrap();
            w.item(0);
            w.int(1);
            w.item(1);
            w.bytes(b"hi").unwrap();
            w.end_array();
            w.end_map();
        });
        assert_eq!(out, r#"{"a":[1,"aGk="]}"#);
    }
}
