use crate::wire::WireWriter;
use keel_schema::{length_header, BigInt, ByteBufferMut};

pub(crate) struct MsgpackWriter {
    bb: ByteBufferMut,
}

impl MsgpackWriter {
    pub fn new(out: Vec<u8>) -> MsgpackWriter {
        MsgpackWriter {
            bb: ByteBufferMut::from_vec(out),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bb.data()
    }
}

fn header_len(len: usize) -> Result<u32, String> {
    length_header(len).map_err(|e| e.to_string())
}

impl WireWriter for MsgpackWriter {
    fn str_keys(&self) -> bool {
        false
    }

    fn supports_ext(&self) -> bool {
        true
    }

    fn null(&mut self) {
        self.bb.write_nil();
    }

    fn bool(&mut self, value: bool) {
        self.bb.write_bool(value);
    }

    fn int(&mut self, value: i64) {
        self.bb.write_int(value);
    }

    fn uint(&mut self, value: u64) {
        self.bb.write_uint(value);
    }

    fn bigint(&mut self, value: &BigInt) -> Result<(), String> {
        if let Some(value) = value.to_i64() {
            self.bb.write_int(value);
        } else if let Some(value) = value.to_u64() {
            self.bb.write_uint(value);
        } else {
            return Err("Integer value out of range".to_owned());
        }
        Ok(())
    }

    fn float(&mut self, value: f64) {
        self.bb.write_f64(value);
    }

    fn str(&mut self, value: &str) -> Result<(), String> {
        self.bb.write_str(value).map_err(|e| e.to_string())
    }

    fn bytes(&mut self, value: &[u8]) -> Result<(), String> {
        self.bb.write_bin(value).map_err(|e| e.to_string())
    }

    fn ext(&mut self, code: i8, data: &[u8]) -> Result<(), String> {
        self.bb.write_ext(code, data).map_err(|e| e.to_string())
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.bb.write_bytes(bytes);
        Ok(())
    }

    fn begin_array(&mut self, len: usize) -> Result<(), String> {
        self.bb.write_array_len(header_len(len)?);
        Ok(())
    }

    fn item(&mut self, _index: usize) {}

    fn end_array(&mut self) {}

    fn begin_map(&mut self, len: usize) -> Result<(), String> {
        self.bb.write_map_len(header_len(len)?);
        Ok(())
    }

    fn key(&mut self, _index: usize) {}

    fn value(&mut self) {}

    fn end_map(&mut self) {}
}
