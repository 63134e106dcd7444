//! Encoding, generic over the wire format.
//!
//! The value drives the walk. A schema, when given, only supplies hints:
//! ints are widened where a float is expected, and struct values are
//! checked against the struct the schema expects at that position.

use crate::{
    error::{Error, Result},
    hooks::Hooks,
    options::{EncodeOptions, Order},
    path::Path,
    wire::WireWriter,
};
use keel_schema::{
    FieldSchema, LiteralValue, Node, Schema, ShapeMember, StructSchema, StructValue, Value,
};

use std::sync::Arc;
use tracing::{debug, trace};

/// Writes `value` through `writer`.
pub(crate) fn write<W: WireWriter>(
    writer: &mut W,
    schema: Option<&Schema>,
    options: &EncodeOptions,
    hooks: &Hooks,
    value: &Value,
) -> Result<()> {
    trace!(kind = value.kind_name(), typed = schema.is_some(), "encode");
    let mut state = EncodeState {
        writer,
        schema,
        options,
        hooks,
        depth: 0,
    };
    state.value(value, schema.map(Schema::root), &Path::root())
}

/// Looks through a custom type to the carrier it travels as.
fn carrier(hint: Option<&Node>) -> Option<&Node> {
    match hint {
        Some(Node::Custom(custom)) => Some(&custom.carrier),
        other => other,
    }
}

fn wants_float(hint: Option<&Node>) -> bool {
    match carrier(hint) {
        Some(Node::Float(_)) => true,
        Some(Node::Union(union)) => union.float.is_some() && union.int.is_none(),
        _ => false,
    }
}

fn item_hint(hint: Option<&Node>, index: usize) -> Option<&Node> {
    match carrier(hint)? {
        Node::Array(array) => Some(&array.item),
        Node::Tuple(items) => items.get(index),
        Node::Union(union) => match &union.array {
            Some(ShapeMember::Node(node)) => item_hint(Some(node), index),
            _ => None,
        },
        _ => None,
    }
}

fn entry_hints(hint: Option<&Node>) -> (Option<&Node>, Option<&Node>) {
    match carrier(hint) {
        Some(Node::Map(map)) => (Some(&map.key), Some(&map.value)),
        Some(Node::Union(union)) => match &union.object {
            Some(ShapeMember::Node(node)) => entry_hints(Some(node)),
            _ => (None, None),
        },
        _ => (None, None),
    }
}

fn omitted(field: &FieldSchema, value: &Value) -> bool {
    field.default.as_ref().map_or(false, |default| default.matches(value))
}

struct EncodeState<'s, 'w, W> {
    writer:  &'w mut W,
    schema:  Option<&'s Schema>,
    options: &'s EncodeOptions,
    hooks:   &'s Hooks,
    depth:   usize,
}

impl<'s, 'w, W: WireWriter> EncodeState<'s, 'w, W> {
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

    fn value(&mut self, value: &Value, hint: Option<&'s Node>, path: &Path) -> Result<()> {
        match value {
            Value::Null => self.writer.null(),
            Value::Bool(b) => self.writer.bool(*b),
            Value::Int(i) if wants_float(hint) => self.writer.float(*i as f64),
            Value::UInt(u) if wants_float(hint) => self.writer.float(*u as f64),
            Value::BigInt(b) if wants_float(hint) => self.writer.float(b.to_f64()),
            Value::Int(i) => self.writer.int(*i),
            Value::UInt(u) => self.writer.uint(*u),
            Value::BigInt(b) => self
                .writer
                .bigint(b)
                .map_err(|message| Error::encode(message, path))?,
            Value::Float(f) => self.writer.float(*f),
            Value::Str(s) => self.writer.str(s).map_err(|message| Error::encode(message, path))?,
            Value::Bytes(b) => self.writer.bytes(b).map_err(|message| Error::encode(message, path))?,
            Value::List(items) | Value::Tuple(items) => {
                let items: Vec<&Value> = items.iter().collect();
                self.array(&items, hint, path)?;
            }
            Value::Set(items) => {
                let mut items: Vec<&Value> = items.iter().collect();
                if self.options.order == Order::Deterministic {
                    items.sort_by(|a, b| a.cmp_for_sort(b));
                }
                self.array(&items, hint, path)?;
            }
            Value::Map(entries) => self.map(entries, hint, path)?,
            Value::Struct(value) => self.structure(value, hint, path)?,
            Value::Enum(member) => self.literal(member.value(), path)?,
            Value::Raw(raw) => self
                .writer
                .raw(raw.bytes())
                .map_err(|message| Error::encode(message, path))?,
            Value::Ext(ext) if self.writer.supports_ext() => self
                .writer
                .ext(ext.code, &ext.data)
                .map_err(|message| Error::encode(message, path))?,
            Value::Ext(_) => self.replace(value, "ext", hint, path)?,
            Value::Custom(custom) => self.replace(value, custom.type_name(), hint, path)?,
        }
        Ok(())
    }

    /// Hands a value the writer can't represent to the encode hook.
    fn replace(&mut self, value: &Value, type_name: &str, hint: Option<&'s Node>, path: &Path) -> Result<()> {
        let Some(hook) = self.hooks.enc.clone() else {
            return Err(Error::encode(
                format!("Encoding objects of type `{}` is unsupported", type_name),
                path,
            ));
        };
        let replacement = hook(value).map_err(|error| {
            debug!(path = %path.render(), error = %error.message, kind = ?error.kind, "hook failed");
            Error::from_hook(error, path)
        })?;
        if matches!(replacement, Value::Custom(_)) {
            return Err(Error::encode(
                format!("Encoding objects of type `{}` is unsupported", type_name),
                path,
            ));
        }
        self.enter(path)?;
        self.value(&replacement, carrier(hint), path)?;
        self.leave();
        Ok(())
    }

    fn literal(&mut self, value: &LiteralValue, path: &Path) -> Result<()> {
        match value {
            LiteralValue::Str(s) => self.writer.str(s).map_err(|message| Error::encode(message, path))?,
            LiteralValue::Int(i) => self.writer.int(*i),
        }
        Ok(())
    }

    fn array(&mut self, items: &[&Value], hint: Option<&'s Node>, path: &Path) -> Result<()> {
        self.enter(path)?;
        self.writer
            .begin_array(items.len())
            .map_err(|message| Error::encode(message, path))?;
        for (index, item) in items.iter().enumerate() {
            self.writer.item(index);
            self.value(item, item_hint(hint, index), &path.index(index))?;
        }
        self.writer.end_array();
        self.leave();
        Ok(())
    }

    fn map(&mut self, entries: &[(Value, Value)], hint: Option<&'s Node>, path: &Path) -> Result<()> {
        self.enter(path)?;
        let mut entries: Vec<&(Value, Value)> = entries.iter().collect();
        if self.options.order == Order::Deterministic {
            entries.sort_by(|a, b| a.0.cmp_for_sort(&b.0));
        }
        let (key_hint, value_hint) = entry_hints(hint);
        self.writer
            .begin_map(entries.len())
            .map_err(|message| Error::encode(message, path))?;
        for (index, (key, value)) in entries.into_iter().enumerate() {
            self.writer.key(index);
            if self.writer.str_keys() {
                self.str_key(key, path)?;
            } else {
                self.value(key, key_hint, path)?;
            }
            self.writer.value();
            self.value(value, value_hint, &path.key(key))?;
        }
        self.writer.end_map();
        self.leave();
        Ok(())
    }

    fn str_key(&mut self, key: &Value, path: &Path) -> Result<()> {
        let written = match key {
            Value::Str(s) => self.writer.str(s),
            Value::Int(i) => self.writer.str(itoa::Buffer::new().format(*i)),
            Value::UInt(u) => self.writer.str(itoa::Buffer::new().format(*u)),
            Value::BigInt(b) => self.writer.str(&b.to_string()),
            Value::Enum(member) => match member.value() {
                LiteralValue::Str(s) => self.writer.str(s),
                LiteralValue::Int(i) => self.writer.str(itoa::Buffer::new().format(*i)),
            },
            Value::Custom(_) => {
                let Some(hook) = self.hooks.enc.clone() else {
                    return Err(Error::encode("Only dicts with str-like or int-like keys are supported", path));
                };
                let replacement = hook(key).map_err(|error| Error::from_hook(error, path))?;
                if matches!(replacement, Value::Custom(_)) {
                    return Err(Error::encode("Only dicts with str-like or int-like keys are supported", path));
                }
                return self.str_key(&replacement, path);
            }
            _ => return Err(Error::encode("Only dicts with str-like or int-like keys are supported", path)),
        };
        written.map_err(|message| Error::encode(message, path))
    }

    /// The struct the schema expects at this position, if it names one.
    /// Fails when `found` isn't it.
    fn expected_struct(
        &self,
        hint: Option<&'s Node>,
        found: &Arc<StructSchema>,
        path: &Path,
    ) -> Result<Option<&'s Arc<StructSchema>>> {
        let (Some(tree), Some(node)) = (self.schema, carrier(hint)) else {
            return Ok(None);
        };
        let index = match node {
            Node::Struct(index) => Some(*index),
            Node::Union(union) => {
                let member = if found.array_like() { &union.array } else { &union.object };
                match member {
                    Some(ShapeMember::Node(Node::Struct(index))) => Some(*index),
                    Some(ShapeMember::Tagged(table)) => found
                        .tag()
                        .and_then(|tag| table.lookup(&tag.value))
                        .or(table.fallback),
                    _ => None,
                }
            }
            _ => return Ok(None),
        };
        let expected = match index {
            Some(index) => tree.struct_at(index),
            None => {
                let expected = node.expected(tree);
                return Err(Error::encode(
                    format!("Expected `{}`, got `{}`", expected, found.name()),
                    path,
                ));
            }
        };
        if expected.id() != found.id() {
            return Err(Error::encode(
                format!("Expected `{}`, got `{}`", expected.name(), found.name()),
                path,
            ));
        }
        Ok(Some(expected))
    }

    fn structure(&mut self, value: &StructValue, hint: Option<&'s Node>, path: &Path) -> Result<()> {
        let schema = value.schema();
        let expected = self.expected_struct(hint, schema, path)?;
        let hints = |index: usize| expected.map(|s| &s.field(index).node);

        self.enter(path)?;
        let fields = schema.fields();
        let slots = value.slots();
        let omit = schema.options().omit_defaults;
        let offset = schema.tag().is_some() as usize;

        if schema.array_like() {
            let mut len = fields.len();
            if omit {
                while len > 0 && omitted(&fields[len - 1], &slots[len - 1]) {
                    len -= 1;
                }
            }
            self.writer
                .begin_array(len + offset)
                .map_err(|message| Error::encode(message, path))?;
            if let Some(tag) = schema.tag() {
                self.writer.item(0);
                self.literal(&tag.value, path)?;
            }
            for index in 0..len {
                self.writer.item(index + offset);
                self.value(&slots[index], hints(index), &path.index(index + offset))?;
            }
            self.writer.end_array();
        } else {
            let included: Vec<usize> = (0..fields.len())
                .filter(|&index| !(omit && omitted(&fields[index], &slots[index])))
                .collect();
            self.writer
                .begin_map(included.len() + offset)
                .map_err(|message| Error::encode(message, path))?;
            if let Some(tag) = schema.tag() {
                self.writer.key(0);
                self.writer
                    .str(&tag.field)
                    .map_err(|message| Error::encode(message, path))?;
                self.writer.value();
                self.literal(&tag.value, path)?;
            }
            for (position, &index) in included.iter().enumerate() {
                let field = &fields[index];
                self.writer.key(position + offset);
                self.writer
                    .str(&field.wire_name)
                    .map_err(|message| Error::encode(message, path))?;
                self.writer.value();
                self.value(&slots[index], hints(index), &path.field(&field.wire_name))?;
            }
            self.writer.end_map();
        }
        self.leave();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonWriter;
    use keel_compiler::compile;
    use keel_schema::{FieldDesc, StructDesc, TypeDesc};

    fn json(schema: Option<&Schema>, options: &EncodeOptions, value: &Value) -> Result<String> {
        let mut writer = JsonWriter::new(Vec::new());
        write(&mut writer, schema, options, &Hooks::default(), value)?;
        Ok(String::from_utf8(writer.into_inner()).unwrap())
    }

    #[test]
    fn float_hints() {
        let schema = compile(&TypeDesc::list(TypeDesc::float())).unwrap();
        let value = Value::List(vec![Value::Int(1), Value::Float(2.5)]);
        let options = EncodeOptions::default();
        assert_eq!(json(Some(&schema), &options, &value).unwrap(), "[1.0,2.5]");
        assert_eq!(json(None, &options, &value).unwrap(), "[1,2.5]");
    }

    #[test]
    fn deterministic_order() {
        let value = Value::map_of(vec![
            (Value::from("b"), Value::set_of(vec![Value::Int(3), Value::Int(1), Value::Int(2)])),
            (Value::from("a"), Value::Null),
        ]);
        let mut options = EncodeOptions::default();
        assert_eq!(json(None, &options, &value).unwrap(), r#"{"b":[3,1,2],"a":null}"#);
        options.order = Order::Deterministic;
        assert_eq!(json(None, &options, &value).unwrap(), r#"{"a":null,"b":[1,2,3]}"#);
    }

    #[test]
    fn struct_identity_is_checked() {
        let point: TypeDesc = StructDesc::new("Point")
            .field(FieldDesc::new("x", TypeDesc::int()))
            .into();
        let other: TypeDesc = StructDesc::new("Other")
            .field(FieldDesc::new("x", TypeDesc::int()))
            .into();
        let expected = compile(&point).unwrap();
        let found = compile(&other).unwrap();
        let value = Value::Struct(StructValue::new(&found.structs()[0], [("x", Value::Int(1))]).unwrap());
        let err = json(Some(&expected), &EncodeOptions::default(), &value).unwrap_err();
        assert_eq!(err.to_string(), "Expected `Point`, got `Other`");
    }

    #[test]
    fn depth_limit() {
        let mut value = Value::Null;
        for _ in 0..4 {
            value = Value::List(vec![value]);
        }
        let options = EncodeOptions { max_depth: 3, ..EncodeOptions::default() };
        assert_eq!(
            json(None, &options, &value).unwrap_err(),
            Error::DepthExceeded { path: "$[0][0][0]".into() }
        );
    }
}
