//! JSON decoding and encoding.
//!
//! ```
//! use keel::{json, FieldDesc, StructDesc, TypeDesc};
//!
//! let desc: TypeDesc = StructDesc::new("Point")
//!     .field(FieldDesc::new("x", TypeDesc::int()))
//!     .field(FieldDesc::new("y", TypeDesc::int()))
//!     .into();
//! let schema = keel::compile(&desc).unwrap();
//!
//! let point = json::decode(&schema, br#"{"y": 2, "x": 1}"#).unwrap();
//! assert_eq!(json::encode(Some(&schema), &point).unwrap(), br#"{"x":1,"y":2}"#);
//! ```

mod reader;
mod writer;

pub(crate) use reader::JsonReader;
pub(crate) use writer::JsonWriter;

use crate::{
    decode::{self, Core},
    encode,
    error::{Format, Result},
    hooks::{HookError, Hooks},
    options::{DecodeOptions, EncodeOptions},
    stream::{Framing, Messages},
    wire::WireReader,
};
use keel_compiler::global_cache;
use keel_schema::{CustomSchema, Schema, TypeDesc, Value};

use std::{ops::Range, sync::Arc};

/// Decodes and validates one JSON document.
pub fn decode<'de>(schema: &Schema, input: &'de [u8]) -> Result<Value<'de>> {
    let mut reader = JsonReader::new(input);
    decode::run(&mut reader, schema, &DecodeOptions::default(), &Hooks::default(), true)
}

/// Encodes `value` as compact JSON. The schema, when given, decides how
/// ints under float types and struct values are written.
pub fn encode(schema: Option<&Schema>, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(schema, value, &mut buf, 0)?;
    Ok(buf)
}

/// Encodes into `buf` starting at `offset` and returns the written range.
/// Bytes before `offset` are kept; the buffer is padded with zeros if it
/// is shorter and truncated if it is longer.
pub fn encode_into(schema: Option<&Schema>, value: &Value, buf: &mut Vec<u8>, offset: usize) -> Result<Range<usize>> {
    write(schema, &EncodeOptions::default(), &Hooks::default(), value, buf, offset)
}

fn write(
    schema: Option<&Schema>,
    options: &EncodeOptions,
    hooks: &Hooks,
    value: &Value,
    buf: &mut Vec<u8>,
    offset: usize,
) -> Result<Range<usize>> {
    buf.resize(offset, 0);
    let mut writer = JsonWriter::new(std::mem::take(buf));
    let result = encode::write(&mut writer, schema, options, hooks, value);
    *buf = writer.into_inner();
    match result {
        Ok(()) => Ok(offset..buf.len()),
        Err(error) => {
            buf.truncate(offset);
            Err(error)
        }
    }
}

fn step<'de>(core: &Core, input: &'de [u8], offset: usize, finish: bool) -> (Result<Value<'de>>, usize) {
    let mut reader = JsonReader::at(input, offset);
    let result = core.run(&mut reader, finish);
    (result, reader.offset())
}

fn skip_whitespace(input: &[u8], offset: usize) -> usize {
    let mut reader = JsonReader::at(input, offset);
    reader.skip_whitespace();
    reader.offset()
}

/// A reusable JSON decoder bound to one compiled schema.
#[derive(Debug, Clone)]
pub struct Decoder {
    core: Core,
}

impl Decoder {
    pub fn new(schema: Arc<Schema>) -> Decoder {
        Decoder { core: Core::new(schema) }
    }

    /// Compiles `desc` through the global cache.
    pub fn for_type(desc: &Arc<TypeDesc>) -> Result<Decoder> {
        Ok(Decoder::new(global_cache().get_or_compile(desc)?))
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.core.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.core.hooks = hooks;
        self
    }

    pub fn dec_hook<F>(mut self, hook: F) -> Self
    where
        F: for<'de> Fn(&CustomSchema, Value<'de>) -> Result<Value<'de>, HookError> + Send + Sync + 'static,
    {
        self.core.hooks = std::mem::take(&mut self.core.hooks).dec_hook(hook);
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.core.schema
    }

    pub fn decode<'de>(&self, input: &'de [u8]) -> Result<Value<'de>> {
        self.core.run(&mut JsonReader::new(input), true)
    }

    /// Iterates over the documents of a stream.
    pub fn messages<'d, 'de>(&'d self, input: &'de [u8], framing: Framing) -> Messages<'d, 'de> {
        Messages::new(&self.core, input, framing, Format::Json, step, skip_whitespace)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    schema:  Option<Arc<Schema>>,
    options: EncodeOptions,
    hooks:   Hooks,
}

impl Encoder {
    pub fn new(schema: Option<Arc<Schema>>) -> Encoder {
        Encoder {
            schema,
            ..Encoder::default()
        }
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn enc_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Result<Value<'static>, HookError> + Send + Sync + 'static,
    {
        self.hooks = std::mem::take(&mut self.hooks).enc_hook(hook);
        self
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(value, &mut buf, 0)?;
        Ok(buf)
    }

    pub fn encode_into(&self, value: &Value, buf: &mut Vec<u8>, offset: usize) -> Result<Range<usize>> {
        write(self.schema.as_deref(), &self.options, &self.hooks, value, buf, offset)
    }
}
