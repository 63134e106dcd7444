//! Single-pass decode and validation, generic over the wire format.
//!
//! The walk is keyed by the schema node: each node asks the reader for the
//! shape it expects and fails at the first mismatch, so a value is either
//! fully validated or not produced at all.

use crate::{
    coerce,
    error::{Error, Result, ValidationKind},
    hooks::Hooks,
    options::DecodeOptions,
    path::Path,
    wire::{Scalar, Wire, WireReader},
};
use keel_schema::{
    ArrayKind, ArraySchema, CustomSchema, EnumValue, LiteralValue, MapSchema, Node, RawFragment,
    Schema, ShapeMember, StructRef, StructValue, TagTable, UnionSchema, Value,
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::{borrow::Cow, sync::Arc};
use tracing::{debug, trace};

/// A compiled schema with the options and hooks to decode against it.
#[derive(Debug, Clone)]
pub(crate) struct Core {
    pub schema:  Arc<Schema>,
    pub options: DecodeOptions,
    pub hooks:   Hooks,
}

impl Core {
    pub fn new(schema: Arc<Schema>) -> Core {
        Core {
            schema,
            options: DecodeOptions::default(),
            hooks: Hooks::default(),
        }
    }

    pub fn run<'de, R: WireReader<'de>>(&self, reader: &mut R, finish: bool) -> Result<Value<'de>> {
        run(reader, &self.schema, &self.options, &self.hooks, finish)
    }
}

/// Decodes one value. With `finish` set, anything after it is an error.
pub(crate) fn run<'de, R: WireReader<'de>>(
    reader: &mut R,
    schema: &Schema,
    options: &DecodeOptions,
    hooks: &Hooks,
    finish: bool,
) -> Result<Value<'de>> {
    trace!(format = %R::FORMAT, offset = reader.offset(), "decode");
    let mut state = DecodeState {
        reader,
        schema,
        options,
        hooks,
        depth: 0,
    };
    let value = state.value(schema.root(), &Path::root())?;
    if finish {
        state.reader.finish()?;
    }
    Ok(value)
}

/// What a tag lookahead found.
enum Found<'de> {
    Absent,
    Value(Scalar<'de>),
    Other(Wire),
}

struct DecodeState<'s, 'r, R> {
    reader:  &'r mut R,
    schema:  &'s Schema,
    options: &'s DecodeOptions,
    hooks:   &'s Hooks,
    depth:   usize,
}

impl<'s, 'r, 'de, R: WireReader<'de>> DecodeState<'s, 'r, R> {
    fn enter(&mut self, path: &Path) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::DepthExceeded { path: path.render() });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn mismatch(&self, node: &Node, got: Wire, path: &Path) -> Error {
        Error::mismatch(node.expected(self.schema), got.name(), path)
    }

    fn hook_error(&self, error: crate::hooks::HookError, path: &Path) -> Error {
        debug!(path = %path.render(), error = %error.message, kind = ?error.kind, "hook failed");
        Error::from_hook(error, path)
    }

    fn value(&mut self, node: &'s Node, path: &Path) -> Result<Value<'de>> {
        match node {
            Node::Any => self.any(path),
            Node::Raw => match self.reader.raw()? {
                Some(bytes) => Ok(Value::Raw(RawFragment::new(bytes))),
                None => {
                    let wire = self.reader.peek()?;
                    Err(Error::mismatch("raw", wire.name(), path))
                }
            },
            Node::Array(array) => self.array(array, path),
            Node::Tuple(items) => self.tuple(items, path),
            Node::Map(map) => self.map(map, path),
            Node::Struct(index) => self.structure(*index, path),
            Node::Union(union) => self.union(union, path),
            Node::Custom(custom) => self.custom(custom, path),
            Node::Null
            | Node::Bool
            | Node::Int(_)
            | Node::Float(_)
            | Node::Str(_)
            | Node::Bytes(_)
            | Node::Enum(_)
            | Node::Literal(_) => {
                let wire = self.reader.peek()?;
                match wire {
                    Wire::Array | Wire::Map | Wire::Ext | Wire::Opaque(_) => {
                        Err(self.mismatch(node, wire, path))
                    }
                    _ => {
                        let scalar = self.reader.scalar(matches!(node, Node::Float(_)))?;
                        self.scalar(node, scalar, path)
                    }
                }
            }
        }
    }

    /// Validates a scalar against a scalar node.
    fn scalar(&self, node: &'s Node, scalar: Scalar<'de>, path: &Path) -> Result<Value<'de>> {
        let lax = !self.options.strict;
        let wire = scalar.wire();
        match node {
            Node::Null => match scalar {
                Scalar::Null => Ok(Value::Null),
                Scalar::Str(s) if lax && coerce::str_to_null(&s) => Ok(Value::Null),
                _ => Err(self.mismatch(node, wire, path)),
            },
            Node::Bool => match scalar {
                Scalar::Bool(b) => Ok(Value::Bool(b)),
                Scalar::Str(s) if lax => coerce::str_to_bool(&s)
                    .map(Value::Bool)
                    .ok_or_else(|| self.mismatch(node, wire, path)),
                Scalar::Int(i) if lax => coerce::int_to_bool(i)
                    .map(Value::Bool)
                    .ok_or_else(|| self.mismatch(node, wire, path)),
                _ => Err(self.mismatch(node, wire, path)),
            },
            Node::Int(constraints) => {
                let scalar = match scalar {
                    Scalar::Float(f) if lax => coerce::float_to_int(f).map(Scalar::Int),
                    Scalar::Str(s) if lax => coerce::str_to_int(&s),
                    other => Some(other),
                };
                let value = match scalar {
                    Some(Scalar::Int(i)) => Value::Int(i),
                    Some(Scalar::UInt(u)) => Value::UInt(u),
                    Some(Scalar::Big(b)) => Value::BigInt(b),
                    _ => return Err(self.mismatch(node, wire, path)),
                };
                if !constraints.is_unconstrained() {
                    let checked = match (&value, value.to_i128()) {
                        (_, Some(v)) => constraints.check(v),
                        (Value::BigInt(b), None) => constraints.check_big(b),
                        _ => Ok(()),
                    };
                    checked.map_err(|detail| Error::constraint("int", detail, path))?;
                }
                Ok(value)
            }
            Node::Float(constraints) => {
                let value = match scalar {
                    Scalar::Float(f) => f,
                    Scalar::Int(i) => i as f64,
                    Scalar::UInt(u) => u as f64,
                    Scalar::Big(b) => b.to_f64(),
                    Scalar::Str(s) if lax => {
                        coerce::str_to_float(&s).ok_or_else(|| self.mismatch(node, wire, path))?
                    }
                    _ => return Err(self.mismatch(node, wire, path)),
                };
                constraints
                    .check(value)
                    .map_err(|detail| Error::constraint("float", detail, path))?;
                Ok(Value::Float(value))
            }
            Node::Str(schema) => match scalar {
                Scalar::Str(s) => {
                    schema
                        .check(&s)
                        .map_err(|detail| Error::constraint("str", detail, path))?;
                    Ok(Value::Str(s))
                }
                _ => Err(self.mismatch(node, wire, path)),
            },
            Node::Bytes(len) => {
                let bytes = match scalar {
                    Scalar::Bytes(b) => b,
                    Scalar::Str(s) if self.reader.bytes_as_str() => match BASE64.decode(s.as_bytes()) {
                        Ok(decoded) => Cow::Owned(decoded),
                        Err(_) => {
                            return Err(Error::constraint("str", "of valid base64".to_owned(), path))
                        }
                    },
                    _ => return Err(self.mismatch(node, wire, path)),
                };
                len.check(bytes.len())
                    .map_err(|detail| Error::constraint("bytes", detail, path))?;
                Ok(Value::Bytes(bytes))
            }
            Node::Enum(schema) => {
                let index = match scalar {
                    Scalar::Str(s) if !schema.is_int() => schema.lookup_str(&s).ok_or_else(|| {
                        Error::validation(ValidationKind::InvalidEnum(format!("'{}'", s)), path)
                    })?,
                    Scalar::Int(i) if schema.is_int() => schema.lookup_int(i).ok_or_else(|| {
                        Error::validation(ValidationKind::InvalidEnum(i.to_string()), path)
                    })?,
                    Scalar::Str(s) if lax && schema.is_int() => match coerce::str_to_int(&s) {
                        Some(Scalar::Int(i)) => return self.scalar(node, Scalar::Int(i), path),
                        _ => return Err(self.mismatch(node, wire, path)),
                    },
                    _ => return Err(self.mismatch(node, wire, path)),
                };
                Ok(Value::Enum(EnumValue::new(schema.clone(), index)))
            }
            Node::Literal(literal) => match scalar {
                Scalar::Str(s) if literal.has_strs() => {
                    if literal.contains_str(&s) {
                        Ok(Value::Str(s))
                    } else {
                        Err(Error::validation(ValidationKind::InvalidValue(format!("'{}'", s)), path))
                    }
                }
                Scalar::Int(i) if literal.has_ints() => {
                    if literal.contains_int(i) {
                        Ok(Value::Int(i))
                    } else {
                        Err(Error::validation(ValidationKind::InvalidValue(i.to_string()), path))
                    }
                }
                _ => Err(self.mismatch(node, wire, path)),
            },
            _ => Err(self.mismatch(node, wire, path)),
        }
    }

    fn any(&mut self, path: &Path) -> Result<Value<'de>> {
        match self.reader.peek()? {
            Wire::Array => {
                self.enter(path)?;
                let mut seq = self.reader.begin_array()?;
                let mut items = Vec::new();
                while self.reader.next(&mut seq)? {
                    let item = self.any(&path.index(items.len()))?;
                    items.push(item);
                }
                self.leave();
                Ok(Value::List(items))
            }
            Wire::Map => {
                self.enter(path)?;
                let mut seq = self.reader.begin_map()?;
                let mut entries = Vec::new();
                while self.reader.next(&mut seq)? {
                    let key = self.any(path)?;
                    self.reader.key_end()?;
                    let value = self.any(&path.key(&key))?;
                    entries.push((key, value));
                }
                self.leave();
                Ok(Value::map_of(entries))
            }
            Wire::Ext => {
                let scalar = self.reader.scalar(false)?;
                self.ext(scalar, path)
            }
            wire @ Wire::Opaque(_) => self
                .reader
                .opaque()
                .ok_or_else(|| Error::mismatch("any", wire.name(), path)),
            _ => Ok(self.reader.scalar(false)?.into_value()),
        }
    }

    fn ext(&self, scalar: Scalar<'de>, path: &Path) -> Result<Value<'de>> {
        match (scalar, &self.hooks.ext) {
            (Scalar::Ext(code, data), Some(hook)) => {
                hook(code, &data[..]).map_err(|e| self.hook_error(e, path))
            }
            (other, _) => Ok(other.into_value()),
        }
    }

    fn custom(&mut self, custom: &'s CustomSchema, path: &Path) -> Result<Value<'de>> {
        let carrier = self.value(&custom.carrier, path)?;
        match &self.hooks.dec {
            Some(hook) => hook(custom, carrier).map_err(|e| self.hook_error(e, path)),
            None => Ok(carrier),
        }
    }

    fn array(&mut self, array: &'s ArraySchema, path: &Path) -> Result<Value<'de>> {
        let wire = self.reader.peek()?;
        if wire != Wire::Array {
            return Err(Error::mismatch("array", wire.name(), path));
        }
        self.enter(path)?;
        let mut seq = self.reader.begin_array()?;
        let mut items = Vec::new();
        while self.reader.next(&mut seq)? {
            let item = self.value(&array.item, &path.index(items.len()))?;
            items.push(item);
        }
        self.leave();

        let value = match array.kind {
            ArrayKind::List => Value::List(items),
            ArrayKind::Set => Value::set_of(items),
            ArrayKind::Tuple => Value::Tuple(items),
        };
        array
            .len
            .check(value.len())
            .map_err(|detail| Error::constraint("array", detail, path))?;
        Ok(value)
    }

    fn tuple(&mut self, nodes: &'s [Node], path: &Path) -> Result<Value<'de>> {
        let wire = self.reader.peek()?;
        if wire != Wire::Array {
            return Err(Error::mismatch("array", wire.name(), path));
        }
        self.enter(path)?;
        let mut seq = self.reader.begin_array()?;
        let mut items = Vec::with_capacity(nodes.len());
        let mut count = 0;
        while self.reader.next(&mut seq)? {
            match nodes.get(count) {
                Some(node) => items.push(self.value(node, &path.index(count))?),
                None => self.reader.skip()?,
            }
            count += 1;
        }
        self.leave();

        if count != nodes.len() {
            return Err(Error::constraint(
                "array",
                format!("of length {}, got {}", nodes.len(), count),
                path,
            ));
        }
        Ok(Value::Tuple(items))
    }

    fn map(&mut self, map: &'s MapSchema, path: &Path) -> Result<Value<'de>> {
        let wire = self.reader.peek()?;
        if wire != Wire::Map {
            return Err(Error::mismatch("object", wire.name(), path));
        }
        self.enter(path)?;
        let mut seq = self.reader.begin_map()?;
        let mut entries = Vec::new();
        while self.reader.next(&mut seq)? {
            let key = self.key(&map.key, path)?;
            self.reader.key_end()?;
            let value = self.value(&map.value, &path.key(&key))?;
            entries.push((key, value));
        }
        self.leave();

        let value = Value::map_of(entries);
        map.len
            .check(value.len())
            .map_err(|detail| Error::constraint("object", detail, path))?;
        Ok(value)
    }

    /// Map keys. Numeric key types are parsed out of string keys on
    /// formats where keys are always strings.
    fn key(&mut self, node: &'s Node, path: &Path) -> Result<Value<'de>> {
        if !self.reader.str_keys() || self.reader.peek()? != Wire::Str {
            return self.value(node, path);
        }
        let target = match node {
            Node::Int(_) | Node::Float(_) => Some(node),
            Node::Enum(schema) if schema.is_int() => Some(node),
            Node::Literal(literal) if literal.has_ints() && !literal.has_strs() => Some(node),
            Node::Union(union) if union.text.is_none() => union.int.as_ref().or(union.float.as_ref()),
            _ => None,
        };
        let Some(target) = target else {
            return self.value(node, path);
        };
        let Scalar::Str(text) = self.reader.scalar(false)? else {
            return Err(Error::mismatch(node.expected(self.schema), "str", path));
        };
        let parsed = match target {
            Node::Float(_) => coerce::str_to_float(&text).map(Scalar::Float),
            _ => coerce::str_to_int(&text),
        };
        match parsed {
            Some(scalar) => self.scalar(target, scalar, path),
            None => Err(Error::mismatch(node.expected(self.schema), "str", path)),
        }
    }

    fn union(&mut self, union: &'s UnionSchema, path: &Path) -> Result<Value<'de>> {
        let wire = self.reader.peek()?;
        let lax = !self.options.strict;
        let target = match wire {
            Wire::Null if union.null => return Ok(self.reader.scalar(false)?.into_value()),
            Wire::Bool if union.bool => return Ok(self.reader.scalar(false)?.into_value()),
            Wire::Int => union.int.as_ref().or(union.float.as_ref()),
            Wire::Float => union.float.as_ref().or(union.int.as_ref().filter(|_| lax)),
            Wire::Str | Wire::Bytes => union.text.as_ref(),
            Wire::Array => return self.shape(union.array.as_ref(), union, wire, path),
            Wire::Map => return self.shape(union.object.as_ref(), union, wire, path),
            _ => None,
        };
        if let Some(node) = target {
            return self.value(node, path);
        }
        if lax && wire == Wire::Str {
            if let Scalar::Str(text) = self.reader.scalar(false)? {
                return self.lax_union(union, &text, path);
            }
        }
        Err(Error::mismatch(union.expected.as_str(), wire.name(), path))
    }

    /// A string arriving at a union without a string member.
    fn lax_union(&self, union: &'s UnionSchema, text: &str, path: &Path) -> Result<Value<'de>> {
        if union.null && coerce::str_to_null(text) {
            return Ok(Value::Null);
        }
        if union.bool {
            if let Some(b) = coerce::str_to_bool(text) {
                return Ok(Value::Bool(b));
            }
        }
        if let Some(node) = &union.int {
            if let Some(scalar) = coerce::str_to_int(text) {
                return self.scalar(node, scalar, path);
            }
        }
        if let Some(node) = &union.float {
            if let Some(f) = coerce::str_to_float(text) {
                return self.scalar(node, Scalar::Float(f), path);
            }
        }
        Err(Error::mismatch(union.expected.as_str(), "str", path))
    }

    fn shape(
        &mut self,
        member: Option<&'s ShapeMember>,
        union: &'s UnionSchema,
        wire: Wire,
        path: &Path,
    ) -> Result<Value<'de>> {
        match member {
            Some(ShapeMember::Node(node)) => self.value(node, path),
            Some(ShapeMember::Tagged(table)) if wire == Wire::Map => {
                let found = self.lookahead_map(table, path)?;
                let target = self.select(table, found, false, path)?;
                self.structure(target, path)
            }
            Some(ShapeMember::Tagged(table)) => {
                let found = self.lookahead_array()?;
                let target = self.select(table, found, true, path)?;
                self.structure(target, path)
            }
            None => Err(Error::mismatch(union.expected.as_str(), wire.name(), path)),
        }
    }

    /// Finds the tag field of the object ahead, leaving the reader where it was.
    fn lookahead_map(&mut self, table: &'s TagTable, path: &Path) -> Result<Found<'de>> {
        let mark = self.reader.mark();
        let mut seq = self.reader.begin_map()?;
        let mut found = Found::Absent;
        while self.reader.next(&mut seq)? {
            let key = self.key_str()?;
            self.reader.key_end()?;
            if key.as_deref() == Some(table.tag_field.as_str()) {
                found = match self.reader.peek()? {
                    Wire::Str | Wire::Int => Found::Value(self.reader.scalar(false)?),
                    other => {
                        let tag_path = path.field(&table.tag_field);
                        return Err(Error::mismatch(table.expected_kind(), other.name(), &tag_path));
                    }
                };
                break;
            }
            self.reader.skip()?;
        }
        self.reader.reset(mark);
        Ok(found)
    }

    /// Reads the first element of the array ahead, leaving the reader where it was.
    fn lookahead_array(&mut self) -> Result<Found<'de>> {
        let mark = self.reader.mark();
        let mut seq = self.reader.begin_array()?;
        let found = if self.reader.next(&mut seq)? {
            match self.reader.peek()? {
                Wire::Str | Wire::Int => Found::Value(self.reader.scalar(false)?),
                other => Found::Other(other),
            }
        } else {
            Found::Absent
        };
        self.reader.reset(mark);
        Ok(found)
    }

    /// Picks the struct for a tag. Missing tags are reported at `path`,
    /// bad ones at the tag's own position.
    fn select(&self, table: &TagTable, found: Found<'de>, array: bool, path: &Path) -> Result<StructRef> {
        let index = path.index(0);
        let field = path.field(&table.tag_field);
        let tag_path = if array { &index } else { &field };
        let hit = match &found {
            Found::Value(Scalar::Str(s)) => table.lookup_str(s),
            Found::Value(Scalar::Int(i)) => table.lookup_int(*i),
            _ => None,
        };
        if let Some(target) = hit {
            return Ok(target);
        }
        match (found, table.fallback) {
            (Found::Absent, Some(fallback)) => Ok(fallback),
            (Found::Value(_) | Found::Other(_), Some(fallback)) if array => Ok(fallback),
            (Found::Absent, None) if array => Err(Error::constraint(
                "array",
                "of at least length 1, got 0".to_owned(),
                path,
            )),
            (Found::Absent, None) => Err(Error::validation(
                ValidationKind::MissingField(table.tag_field.clone()),
                path,
            )),
            (Found::Value(Scalar::Str(s)), _) => Err(Error::validation(
                ValidationKind::InvalidValue(format!("'{}'", s)),
                tag_path,
            )),
            (Found::Value(Scalar::Int(i)), _) => {
                Err(Error::validation(ValidationKind::InvalidValue(i.to_string()), tag_path))
            }
            (Found::Value(other), _) => {
                Err(Error::mismatch(table.expected_kind(), other.wire().name(), tag_path))
            }
            (Found::Other(wire), _) => Err(Error::mismatch(table.expected_kind(), wire.name(), tag_path)),
        }
    }

    /// Reads a map key if it is a string, otherwise skips it.
    fn key_str(&mut self) -> Result<Option<Cow<'de, str>>> {
        if self.reader.peek()? == Wire::Str {
            if let Scalar::Str(key) = self.reader.scalar(false)? {
                return Ok(Some(key));
            }
            return Ok(None);
        }
        self.reader.skip()?;
        Ok(None)
    }

    /// Checks a tag value read from the wire against the struct's own tag.
    fn check_tag(&mut self, tag: &LiteralValue, path: &Path) -> Result<()> {
        let wire = self.reader.peek()?;
        let matches = match (wire, tag) {
            (Wire::Str, LiteralValue::Str(expected)) | (Wire::Int, LiteralValue::Str(expected)) => {
                match self.reader.scalar(false)? {
                    Scalar::Str(s) if s == expected.as_str() => Ok(()),
                    Scalar::Str(s) => Err(format!("'{}'", s)),
                    Scalar::Int(i) => Err(i.to_string()),
                    other => Err(format!("{:?}", other.into_value())),
                }
            }
            (Wire::Str, LiteralValue::Int(expected)) | (Wire::Int, LiteralValue::Int(expected)) => {
                match self.reader.scalar(false)? {
                    Scalar::Int(i) if i == *expected => Ok(()),
                    Scalar::Str(s) => Err(format!("'{}'", s)),
                    Scalar::Int(i) => Err(i.to_string()),
                    other => Err(format!("{:?}", other.into_value())),
                }
            }
            (other, LiteralValue::Str(_)) => return Err(Error::mismatch("str", other.name(), path)),
            (other, LiteralValue::Int(_)) => return Err(Error::mismatch("int", other.name(), path)),
        };
        matches.map_err(|value| Error::validation(ValidationKind::InvalidValue(value), path))
    }

    fn structure(&mut self, index: StructRef, path: &Path) -> Result<Value<'de>> {
        let tree: &'s Schema = self.schema;
        let schema = tree.struct_at(index);
        let wire = self.reader.peek()?;
        let expected = if schema.array_like() { Wire::Array } else { Wire::Map };
        if wire != expected {
            return Err(Error::mismatch(schema.wire_kind(), wire.name(), path));
        }
        self.enter(path)?;
        let slots = if schema.array_like() {
            self.array_fields(schema, path)?
        } else {
            self.object_fields(schema, path)?
        };
        self.leave();

        StructValue::from_partial(schema, slots)
            .map(Value::Struct)
            .map_err(|missing| {
                let name = schema.field(missing).wire_name.clone();
                Error::validation(ValidationKind::MissingField(name), path)
            })
    }

    fn object_fields(
        &mut self,
        schema: &'s Arc<keel_schema::StructSchema>,
        path: &Path,
    ) -> Result<Vec<Option<Value<'de>>>> {
        let mut slots: Vec<Option<Value<'de>>> = vec![None; schema.fields().len()];
        let mut seq = self.reader.begin_map()?;
        while self.reader.next(&mut seq)? {
            let wire = self.reader.peek()?;
            let Some(key) = self.key_str()? else {
                return Err(Error::mismatch("str", wire.name(), path));
            };
            self.reader.key_end()?;

            if let Some(index) = schema.field_index(&key) {
                let field = schema.field(index);
                slots[index] = Some(self.value(&field.node, &path.field(&field.wire_name))?);
            } else if let Some(tag) = schema.tag().filter(|tag| tag.field == key) {
                self.check_tag(&tag.value, &path.field(&tag.field))?;
            } else if schema.options().forbid_unknown_fields {
                return Err(Error::validation(ValidationKind::UnknownField(key.into_owned()), path));
            } else {
                self.reader.skip()?;
            }
        }
        Ok(slots)
    }

    fn array_fields(
        &mut self,
        schema: &'s Arc<keel_schema::StructSchema>,
        path: &Path,
    ) -> Result<Vec<Option<Value<'de>>>> {
        let fields = schema.fields();
        let offset = schema.tag().is_some() as usize;
        let min = schema.required_len() + offset;
        let mut slots: Vec<Option<Value<'de>>> = Vec::with_capacity(fields.len());
        let mut count = 0;
        let mut seq = self.reader.begin_array()?;
        while self.reader.next(&mut seq)? {
            match (count, schema.tag()) {
                (0, Some(tag)) => self.check_tag(&tag.value, &path.index(0))?,
                _ => match fields.get(count - offset) {
                    Some(field) => slots.push(Some(self.value(&field.node, &path.index(count))?)),
                    None if schema.options().forbid_unknown_fields => {
                        // Count the rest for the message.
                        let mut total = count + 1;
                        self.reader.skip()?;
                        while self.reader.next(&mut seq)? {
                            self.reader.skip()?;
                            total += 1;
                        }
                        return Err(Error::constraint(
                            "array",
                            format!("of at most length {}, got {}", fields.len() + offset, total),
                            path,
                        ));
                    }
                    None => self.reader.skip()?,
                },
            }
            count += 1;
        }
        if count < min {
            return Err(Error::constraint(
                "array",
                format!("of at least length {}, got {}", min, count),
                path,
            ));
        }
        slots.resize(fields.len(), None);
        Ok(slots)
    }
}
