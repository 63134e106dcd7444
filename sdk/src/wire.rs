//! The seam between the format-independent engines and each wire format.
//!
//! A [`WireReader`] is a pull parser: the decode engine peeks at the shape
//! of the next value, then asks for a scalar or walks a container. A
//! [`WireWriter`] is the push counterpart used by the encode engine.

use crate::error::{Format, Result};
use keel_schema::{BigInt, Ext, Value};

use std::borrow::Cow;

/// The shape of the next value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wire {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Array,
    Map,
    Ext,
    /// A value with no wire shape, only seen when reading generic values.
    Opaque(&'static str),
}

impl Wire {
    pub fn name(self) -> &'static str {
        match self {
            Wire::Null => "null",
            Wire::Bool => "bool",
            Wire::Int => "int",
            Wire::Float => "float",
            Wire::Str => "str",
            Wire::Bytes => "bytes",
            Wire::Array => "array",
            Wire::Map => "object",
            Wire::Ext => "ext",
            Wire::Opaque(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar<'de> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Big(BigInt),
    Float(f64),
    Str(Cow<'de, str>),
    Bytes(Cow<'de, [u8]>),
    Ext(i8, Cow<'de, [u8]>),
}

impl<'de> Scalar<'de> {
    pub fn wire(&self) -> Wire {
        match self {
            Scalar::Null => Wire::Null,
            Scalar::Bool(_) => Wire::Bool,
            Scalar::Int(_) | Scalar::UInt(_) | Scalar::Big(_) => Wire::Int,
            Scalar::Float(_) => Wire::Float,
            Scalar::Str(_) => Wire::Str,
            Scalar::Bytes(_) => Wire::Bytes,
            Scalar::Ext(..) => Wire::Ext,
        }
    }

    pub fn into_value(self) -> Value<'de> {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Int(v) => Value::Int(v),
            Scalar::UInt(v) => Value::UInt(v),
            Scalar::Big(v) => Value::BigInt(v),
            Scalar::Float(v) => Value::Float(v),
            Scalar::Str(v) => Value::Str(v),
            Scalar::Bytes(v) => Value::Bytes(v),
            Scalar::Ext(code, data) => Value::Ext(Ext { code, data }),
        }
    }
}

/// Cursor state for one array or map.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Seq {
    /// Elements (or entries) left, for length-prefixed formats.
    pub remaining: Option<usize>,
    pub started:   bool,
    pub map:       bool,
}

impl Seq {
    pub fn counted(len: usize, map: bool) -> Seq {
        Seq {
            remaining: Some(len),
            started: false,
            map,
        }
    }

    pub fn delimited(map: bool) -> Seq {
        Seq {
            remaining: None,
            started: false,
            map,
        }
    }
}

pub(crate) trait WireReader<'de> {
    const FORMAT: Format;

    type Mark: Clone;

    /// Current byte offset, for error messages and stream framing.
    fn offset(&self) -> usize;

    fn mark(&self) -> Self::Mark;

    fn reset(&mut self, mark: Self::Mark);

    /// Classifies the next value without consuming it.
    fn peek(&mut self) -> Result<Wire>;

    /// Reads the next value, which must be a scalar. With `float` set,
    /// number literals are read as floats whatever their spelling.
    fn scalar(&mut self, float: bool) -> Result<Scalar<'de>>;

    fn begin_array(&mut self) -> Result<Seq>;

    fn begin_map(&mut self) -> Result<Seq>;

    /// Moves to the next element, or the next entry's key. Returns `false`
    /// and consumes the container's end once it is exhausted.
    fn next(&mut self, seq: &mut Seq) -> Result<bool>;

    /// Moves from an entry's key to its value.
    fn key_end(&mut self) -> Result<()>;

    /// Consumes the next value, whatever it is, without building it.
    fn skip(&mut self) -> Result<()>;

    /// The encoded bytes of the next value, if this reader has them.
    fn raw(&mut self) -> Result<Option<&'de [u8]>>;

    /// Takes the next value as-is when it has no wire shape.
    fn opaque(&mut self) -> Option<Value<'de>> {
        None
    }

    /// Fails if anything but whitespace follows the document.
    fn finish(&mut self) -> Result<()>;

    /// Map keys are always strings in this format.
    fn str_keys(&self) -> bool;

    /// Bytes travel as base64 strings in this format.
    fn bytes_as_str(&self) -> bool;
}

pub(crate) trait WireWriter {
    /// Map keys must be strings; ints are stringified.
    fn str_keys(&self) -> bool;

    fn supports_ext(&self) -> bool;

    fn null(&mut self);

    fn bool(&mut self, value: bool);

    fn int(&mut self, value: i64);

    fn uint(&mut self, value: u64);

    fn bigint(&mut self, value: &BigInt) -> Result<(), String>;

    fn float(&mut self, value: f64);

    fn str(&mut self, value: &str) -> Result<(), String>;

    fn bytes(&mut self, value: &[u8]) -> Result<(), String>;

    fn ext(&mut self, code: i8, data: &[u8]) -> Result<(), String>;

    fn raw(&mut self, bytes: &[u8]) -> Result<(), String>;

    fn begin_array(&mut self, len: usize) -> Result<(), String>;

    /// Called before the element at `index`.
    fn item(&mut self, index: usize);

    fn end_array(&mut self);

    fn begin_map(&mut self, len: usize) -> Result<(), String>;

    /// Called before the key of the entry at `index`.
    fn key(&mut self, index: usize);

    /// Called between a key and its value.
    fn value(&mut self);

    fn end_map(&mut self);
}
