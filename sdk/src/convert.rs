//! Conversion to and from generic values, for handing data to other
//! serialization libraries.
//!
//! A generic value holds only `Null`, `Bool`, `Int`, `UInt`, `BigInt`,
//! `Float`, `Str`, `Bytes`, `List` and `Map`. [`to_generic`] lowers any
//! value to that form by running the encode engine into a tree instead of
//! bytes; [`from_generic`] validates a generic value against a schema by
//! running the decode engine over the tree.
//!
//! ```
//! use keel::{convert, ConvertOptions, Hooks, TypeDesc, Value};
//!
//! let schema = keel::compile(&TypeDesc::map(TypeDesc::int(), TypeDesc::bytes())).unwrap();
//! let options = ConvertOptions { str_keys: true, bytes_as_base64: true, ..ConvertOptions::default() };
//!
//! let value = Value::map_of(vec![(Value::Int(1), Value::from(&b"hi"[..]))]);
//! let generic = convert::to_generic(&value, &options, &Hooks::new()).unwrap();
//! assert_eq!(format!("{:?}", generic), r#"{"1": "aGk="}"#);
//!
//! let back = convert::from_generic(&generic, &schema, &options, &Hooks::new()).unwrap();
//! assert_eq!(back, value);
//! ```

use crate::{
    decode,
    encode,
    error::{Error, Format, Result},
    hooks::Hooks,
    options::{ConvertOptions, DecodeOptions, EncodeOptions, DEFAULT_MAX_DEPTH},
    wire::{Scalar, Seq, Wire, WireReader, WireWriter},
};
use keel_schema::{BigInt, Ext, LiteralValue, Schema, Value};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::{borrow::Cow, slice};

/// Lowers `value` to a generic value.
///
/// Structs become maps keyed by wire name, enums become their values and
/// sets and tuples become lists. Custom values and extension values go
/// through the encode hook; raw fragments can't be converted.
pub fn to_generic(value: &Value, options: &ConvertOptions, hooks: &Hooks) -> Result<Value<'static>> {
    let mut writer = ValueWriter {
        stack:   Vec::new(),
        result:  None,
        options: *options,
    };
    encode::write(&mut writer, None, &EncodeOptions::default(), hooks, value)?;
    Ok(writer.result.unwrap_or(Value::Null))
}

/// Validates a generic value against `schema`, with the same checks and
/// error paths as the decoders. Strings and bytes stay borrowed from
/// `value`.
pub fn from_generic<'a>(
    value: &'a Value<'a>,
    schema: &Schema,
    options: &ConvertOptions,
    hooks: &Hooks,
) -> Result<Value<'a>> {
    let mut reader = ValueReader {
        current: Some(value),
        stack:   Vec::new(),
        options: *options,
    };
    let decode_options = DecodeOptions {
        strict:    options.strict,
        max_depth: DEFAULT_MAX_DEPTH,
    };
    decode::run(&mut reader, schema, &decode_options, hooks, true)
}

#[derive(Clone)]
enum Frame<'a> {
    Seq(slice::Iter<'a, Value<'a>>),
    Map {
        entries: slice::Iter<'a, (Value<'a>, Value<'a>)>,
        value:   Option<&'a Value<'a>>,
    },
}

/// Walks a value tree as if it were a wire format.
struct ValueReader<'a> {
    /// The value the next read consumes.
    current: Option<&'a Value<'a>>,
    stack:   Vec<Frame<'a>>,
    options: ConvertOptions,
}

impl<'a> ValueReader<'a> {
    fn error(&self, message: &str) -> Error {
        Error::malformed(Format::Generic, message, 0)
    }

    fn take(&mut self) -> Result<&'a Value<'a>> {
        self.current.take().ok_or_else(|| self.error("no value to read"))
    }
}

impl<'a> WireReader<'a> for ValueReader<'a> {
    const FORMAT: Format = Format::Generic;

    type Mark = (Option<&'a Value<'a>>, Vec<Frame<'a>>);

    fn offset(&self) -> usize {
        0
    }

    fn mark(&self) -> Self::Mark {
        (self.current, self.stack.clone())
    }

    fn reset(&mut self, mark: Self::Mark) {
        (self.current, self.stack) = mark;
    }

    fn peek(&mut self) -> Result<Wire> {
        let value = self.current.ok_or_else(|| self.error("no value to read"))?;
        Ok(match value {
            Value::Null => Wire::Null,
            Value::Bool(_) => Wire::Bool,
            Value::Int(_) | Value::UInt(_) | Value::BigInt(_) => Wire::Int,
            Value::Float(_) => Wire::Float,
            Value::Str(_) => Wire::Str,
            Value::Bytes(_) => Wire::Bytes,
            Value::List(_) | Value::Tuple(_) | Value::Set(_) => Wire::Array,
            Value::Map(_) => Wire::Map,
            Value::Enum(member) => match member.value() {
                LiteralValue::Str(_) => Wire::Str,
                LiteralValue::Int(_) => Wire::Int,
            },
            Value::Ext(_) => Wire::Ext,
            Value::Struct(_) => Wire::Opaque("struct"),
            Value::Raw(_) => Wire::Opaque("raw"),
            Value::Custom(_) => Wire::Opaque("custom"),
        })
    }

    fn scalar(&mut self, float: bool) -> Result<Scalar<'a>> {
        let value = self.take()?;
        Ok(match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Int(i) if float => Scalar::Float(*i as f64),
            Value::UInt(u) if float => Scalar::Float(*u as f64),
            Value::BigInt(b) if float => Scalar::Float(b.to_f64()),
            Value::Int(i) => Scalar::Int(*i),
            Value::UInt(u) => Scalar::UInt(*u),
            Value::BigInt(b) => Scalar::Big(b.clone()),
            Value::Float(f) => Scalar::Float(*f),
            Value::Str(s) => Scalar::Str(Cow::Borrowed(s.as_ref())),
            Value::Bytes(b) => Scalar::Bytes(Cow::Borrowed(b.as_ref())),
            Value::Enum(member) => match member.value() {
                LiteralValue::Str(s) => Scalar::Str(Cow::Owned(s.clone())),
                LiteralValue::Int(i) => Scalar::Int(*i),
            },
            Value::Ext(ext) => Scalar::Ext(ext.code, Cow::Borrowed(ext.data.as_ref())),
            other => {
                self.current = Some(other);
                return Err(self.error("expected a scalar"));
            }
        })
    }

    fn begin_array(&mut self) -> Result<Seq> {
        match self.take()? {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                self.stack.push(Frame::Seq(items.iter()));
                Ok(Seq::delimited(false))
            }
            other => {
                self.current = Some(other);
                Err(self.error("expected an array"))
            }
        }
    }

    fn begin_map(&mut self) -> Result<Seq> {
        match self.take()? {
            Value::Map(entries) => {
                self.stack.push(Frame::Map {
                    entries: entries.iter(),
                    value:   None,
                });
                Ok(Seq::delimited(true))
            }
            other => {
                self.current = Some(other);
                Err(self.error("expected a map"))
            }
        }
    }

    fn next(&mut self, _seq: &mut Seq) -> Result<bool> {
        let next = match self.stack.last_mut() {
            Some(Frame::Seq(items)) => items.next(),
            Some(Frame::Map { entries, value }) => entries.next().map(|(k, v)| {
                *value = Some(v);
                k
            }),
            None => return Err(self.error("no open container")),
        };
        match next {
            Some(item) => {
                self.current = Some(item);
                Ok(true)
            }
            None => {
                self.stack.pop();
                Ok(false)
            }
        }
    }

    fn key_end(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Map { value, .. }) => {
                self.current = value.take();
                Ok(())
            }
            _ => Err(self.error("no open map")),
        }
    }

    fn skip(&mut self) -> Result<()> {
        self.take().map(|_| ())
    }

    fn raw(&mut self) -> Result<Option<&'a [u8]>> {
        match self.current {
            Some(Value::Raw(raw)) => {
                self.current = None;
                Ok(Some(raw.bytes()))
            }
            _ => Ok(None),
        }
    }

    fn opaque(&mut self) -> Option<Value<'a>> {
        self.current.take().cloned()
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn str_keys(&self) -> bool {
        self.options.str_keys
    }

    fn bytes_as_str(&self) -> bool {
        self.options.bytes_as_base64
    }
}

enum Building {
    List(Vec<Value<'static>>),
    Map {
        entries: Vec<(Value<'static>, Value<'static>)>,
        key:     Option<Value<'static>>,
    },
}

/// Builds a generic value tree from encoder output.
struct ValueWriter {
    stack:   Vec<Building>,
    result:  Option<Value<'static>>,
    options: ConvertOptions,
}

impl ValueWriter {
    fn emit(&mut self, value: Value<'static>) {
        match self.stack.last_mut() {
            Some(Building::List(items)) => items.push(value),
            Some(Building::Map { entries, key }) => match key.take() {
                Some(k) => entries.push((k, value)),
                None => *key = Some(value),
            },
            None => self.result = Some(value),
        }
    }
}

impl WireWriter for ValueWriter {
    fn str_keys(&self) -> bool {
        self.options.str_keys
    }

    fn supports_ext(&self) -> bool {
        false
    }

    fn null(&mut self) {
        self.emit(Value::Null);
    }

    fn bool(&mut self, value: bool) {
        self.emit(Value::Bool(value));
    }

    fn int(&mut self, value: i64) {
        self.emit(Value::Int(value));
    }

    fn uint(&mut self, value: u64) {
        self.emit(Value::UInt(value));
    }

    fn bigint(&mut self, value: &BigInt) -> std::result::Result<(), String> {
        self.emit(Value::BigInt(value.clone()));
        Ok(())
    }

    fn float(&mut self, value: f64) {
        self.emit(Value::Float(value));
    }

    fn str(&mut self, value: &str) -> std::result::Result<(), String> {
        self.emit(Value::Str(Cow::Owned(value.to_owned())));
        Ok(())
    }

    fn bytes(&mut self, value: &[u8]) -> std::result::Result<(), String> {
        if self.options.bytes_as_base64 {
            self.emit(Value::Str(Cow::Owned(BASE64.encode(value))));
        } else {
            self.emit(Value::Bytes(Cow::Owned(value.to_vec())));
        }
        Ok(())
    }

    fn ext(&mut self, code: i8, data: &[u8]) -> std::result::Result<(), String> {
        self.emit(Value::Ext(Ext {
            code,
            data: Cow::Owned(data.to_vec()),
        }));
        Ok(())
    }

    fn raw(&mut self, _bytes: &[u8]) -> std::result::Result<(), String> {
        Err("Raw values can't be converted to generic values".to_owned())
    }

    fn begin_array(&mut self, len: usize) -> std::result::Result<(), String> {
        self.stack.push(Building::List(Vec::with_capacity(len)));
        Ok(())
    }

    fn item(&mut self, _index: usize) {}

    fn end_array(&mut self) {
        if let Some(Building::List(items)) = self.stack.pop() {
            self.emit(Value::List(items));
        }
    }

    fn begin_map(&mut self, len: usize) -> std::result::Result<(), String> {
        self.stack.push(Building::Map {
            entries: Vec::with_capacity(len),
            key:     None,
        });
        Ok(())
    }

    fn key(&mut self, _index: usize) {}

    fn value(&mut self) {}

    fn end_map(&mut self) {
        if let Some(Building::Map { entries, .. }) = self.stack.pop() {
            self.emit(Value::map_of(entries));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_compiler::compile;
    use keel_schema::{FieldDesc, StructDesc, StructValue, TypeDesc};

    #[test]
    fn structs_become_maps() {
        let desc: TypeDesc = StructDesc::new("Job")
            .tag_field("kind")
            .omit_defaults(true)
            .field(FieldDesc::new("id", TypeDesc::int()))
            .field(FieldDesc::new("tags", TypeDesc::set(TypeDesc::str())).default(Value::Set(vec![])))
            .into();
        let schema = compile(&desc).unwrap();
        let job = StructValue::new(&schema.structs()[0], [("id", Value::Int(7))]).unwrap();

        let generic = to_generic(&Value::Struct(job.clone()), &ConvertOptions::default(), &Hooks::new()).unwrap();
        assert_eq!(format!("{:?}", generic), r#"{"kind": "Job", "id": 7}"#);

        let back = from_generic(&generic, &schema, &ConvertOptions::default(), &Hooks::new()).unwrap();
        assert_eq!(back, Value::Struct(job));
    }

    #[test]
    fn raw_and_ext_need_help() {
        let raw = Value::Raw(keel_schema::RawFragment::new(&b"[]"[..]));
        let err = to_generic(&raw, &ConvertOptions::default(), &Hooks::new()).unwrap_err();
        assert_eq!(err.to_string(), "Raw values can't be converted to generic values");

        let ext = Value::Ext(Ext { code: 1, data: Cow::Borrowed(&[9]) });
        let err = to_generic(&ext, &ConvertOptions::default(), &Hooks::new()).unwrap_err();
        assert_eq!(err.to_string(), "Encoding objects of type `ext` is unsupported");

        let hooks = Hooks::new().enc_hook(|value| match value {
            Value::Ext(ext) => Ok(Value::Int(ext.code as i64)),
            _ => Ok(Value::Null),
        });
        assert_eq!(to_generic(&ext, &ConvertOptions::default(), &hooks).unwrap(), Value::Int(1));
    }

    #[test]
    fn from_generic_reports_paths() {
        let schema = compile(&TypeDesc::list(TypeDesc::int())).unwrap();
        let input = Value::List(vec![Value::Int(1), Value::Int(2), Value::from("x")]);
        let err = from_generic(&input, &schema, &ConvertOptions::default(), &Hooks::new()).unwrap_err();
        assert_eq!(err.to_string(), "Expected `int`, got `str` - at `$[2]`");

        let lax = ConvertOptions { strict: false, ..ConvertOptions::default() };
        let value = from_generic(&input, &schema, &lax, &Hooks::new());
        assert!(value.is_err());
        let input = Value::List(vec![Value::from("3")]);
        assert_eq!(
            from_generic(&input, &schema, &lax, &Hooks::new()).unwrap(),
            Value::List(vec![Value::Int(3)])
        );
    }

    #[test]
    fn string_keys_parse_back() {
        let schema = compile(&TypeDesc::map(TypeDesc::int(), TypeDesc::str())).unwrap();
        let generic = Value::map_of(vec![(Value::from("10"), Value::from("ten"))]);
        let options = ConvertOptions { str_keys: true, ..ConvertOptions::default() };
        let value = from_generic(&generic, &schema, &options, &Hooks::new()).unwrap();
        assert_eq!(value, Value::map_of(vec![(Value::Int(10), Value::from("ten"))]));

        let err = from_generic(&generic, &schema, &ConvertOptions::default(), &Hooks::new()).unwrap_err();
        assert_eq!(err.to_string(), "Expected `int`, got `str`");
    }
}
