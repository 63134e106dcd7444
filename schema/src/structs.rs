//! Struct runtime model: compiled field tables, tag lookup and instances.

use crate::{
    desc::{DefaultValue, LiteralValue, StructDesc},
    schema::Node,
    value::Value,
};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Index of a struct within its [`Schema`](crate::Schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructRef(pub usize);

/// The field and value that identify a struct inside a tagged union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructTag {
    pub field: String,
    pub value: LiteralValue,
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub wire_name: String,
    pub node: Node,
    pub default: Option<DefaultValue>,
    pub kw_only: bool,
}

impl FieldSchema {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructOptions {
    pub array_like: bool,
    pub forbid_unknown_fields: bool,
    pub omit_defaults: bool,
}

/// A compiled struct: resolved field order, wire names, tag and options.
#[derive(Debug)]
pub struct StructSchema {
    desc: Arc<StructDesc>,
    fields: Vec<FieldSchema>,
    tag: Option<StructTag>,
    options: StructOptions,
    trackable: bool,
    by_wire_name: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    required_len: usize,
}

impl StructSchema {
    pub fn new(
        desc: Arc<StructDesc>,
        fields: Vec<FieldSchema>,
        tag: Option<StructTag>,
        options: StructOptions,
    ) -> StructSchema {
        let by_wire_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.wire_name.clone(), i))
            .collect();
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        let required_len = fields
            .iter()
            .rposition(FieldSchema::is_required)
            .map_or(0, |i| i + 1);
        let trackable = fields.iter().any(|f| !f.node.is_scalar());
        StructSchema {
            desc,
            fields,
            tag,
            options,
            trackable,
            by_wire_name,
            by_name,
            required_len,
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// Identity of the description this schema was compiled from.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.desc) as usize
    }

    pub fn desc(&self) -> &Arc<StructDesc> {
        &self.desc
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> &FieldSchema {
        &self.fields[index]
    }

    pub fn tag(&self) -> Option<&StructTag> {
        self.tag.as_ref()
    }

    pub fn options(&self) -> StructOptions {
        self.options
    }

    pub fn array_like(&self) -> bool {
        self.options.array_like
    }

    /// Looks up a field by its wire name.
    pub fn field_index(&self, wire_name: &str) -> Option<usize> {
        self.by_wire_name.get(wire_name).copied()
    }

    pub fn field_index_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Whether instances can hold non-scalar values, decided once from the
    /// static field types.
    pub fn is_trackable(&self) -> bool {
        self.trackable
    }

    /// Positional elements an array-like encoding must carry, excluding
    /// the tag: everything up to the last required field.
    pub fn required_len(&self) -> usize {
        self.required_len
    }

    pub fn wire_kind(&self) -> &'static str {
        if self.options.array_like {
            "array"
        } else {
            "object"
        }
    }
}

/// Discriminant table for one class of tagged structs in a union.
#[derive(Debug, Clone)]
pub struct TagTable {
    pub tag_field: String,
    by_str: HashMap<String, StructRef>,
    by_int: HashMap<i64, StructRef>,
    /// The untagged member, chosen when the tag field is absent.
    pub fallback: Option<StructRef>,
}

impl TagTable {
    pub fn new(tag_field: impl Into<String>) -> TagTable {
        TagTable {
            tag_field: tag_field.into(),
            by_str: HashMap::new(),
            by_int: HashMap::new(),
            fallback: None,
        }
    }

    /// Returns `false` if the value is already taken.
    pub fn insert(&mut self, tag: &LiteralValue, target: StructRef) -> bool {
        match tag {
            LiteralValue::Str(s) => self.by_str.insert(s.clone(), target).is_none(),
            LiteralValue::Int(i) => self.by_int.insert(*i, target).is_none(),
        }
    }

    pub fn lookup(&self, tag: &LiteralValue) -> Option<StructRef> {
        match tag {
            LiteralValue::Str(s) => self.lookup_str(s),
            LiteralValue::Int(i) => self.lookup_int(*i),
        }
    }

    pub fn lookup_str(&self, tag: &str) -> Option<StructRef> {
        self.by_str.get(tag).copied()
    }

    pub fn lookup_int(&self, tag: i64) -> Option<StructRef> {
        self.by_int.get(&tag).copied()
    }

    pub fn len(&self) -> usize {
        self.by_str.len() + self.by_int.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wire type of the tag values, for mismatch messages.
    pub fn expected_kind(&self) -> &'static str {
        match (self.by_int.is_empty(), self.by_str.is_empty()) {
            (false, false) => "int | str",
            (false, true) => "int",
            _ => "str",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructError {
    #[error("Missing required field `{0}`")]
    MissingField(String),
    #[error("Unexpected field `{0}`")]
    UnknownField(String),
}

/// An instance of a struct: one slot per field, in schema order.
#[derive(Clone)]
pub struct StructValue<'a> {
    schema: Arc<StructSchema>,
    slots: Vec<Value<'a>>,
}

impl<'a> StructValue<'a> {
    /// Builds an instance from `(field name, value)` pairs, filling omitted
    /// fields from their defaults.
    pub fn new<K, I>(schema: &Arc<StructSchema>, fields: I) -> Result<StructValue<'a>, StructError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value<'a>)>,
    {
        let mut slots: Vec<Option<Value<'a>>> = vec![None; schema.fields.len()];
        for (name, value) in fields {
            let name = name.as_ref();
            let index = schema
                .field_index_by_name(name)
                .ok_or_else(|| StructError::UnknownField(name.to_owned()))?;
            slots[index] = Some(value);
        }
        StructValue::from_partial(schema, slots)
            .map_err(|index| StructError::MissingField(schema.fields[index].name.clone()))
    }

    /// Fills empty slots from defaults. On failure returns the index of the
    /// first required field without a value, in schema order.
    pub fn from_partial(
        schema: &Arc<StructSchema>,
        slots: Vec<Option<Value<'a>>>,
    ) -> Result<StructValue<'a>, usize> {
        let slots = slots
            .into_iter()
            .zip(&schema.fields)
            .enumerate()
            .map(|(index, (slot, field))| match (slot, &field.default) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.get()),
                (None, None) => Err(index),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StructValue { schema: schema.clone(), slots })
    }

    pub fn schema(&self) -> &Arc<StructSchema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.schema
            .field_index_by_name(name)
            .map(|index| &self.slots[index])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value<'a>> {
        self.schema
            .field_index_by_name(name)
            .map(move |index| &mut self.slots[index])
    }

    pub fn set(&mut self, name: &str, value: Value<'a>) -> Result<(), StructError> {
        let slot = self
            .get_mut(name)
            .ok_or_else(|| StructError::UnknownField(name.to_owned()))?;
        *slot = value;
        Ok(())
    }

    pub fn slots(&self) -> &[Value<'a>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Value<'a>> {
        self.slots
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldSchema, &Value<'a>)> {
        self.schema.fields.iter().zip(&self.slots)
    }

    pub fn into_owned(self) -> StructValue<'static> {
        StructValue {
            schema: self.schema,
            slots: self.slots.into_iter().map(Value::into_owned).collect(),
        }
    }
}

impl<'a> PartialEq for StructValue<'a> {
    fn eq(&self, other: &StructValue<'a>) -> bool {
        self.schema.id() == other.schema.id() && self.slots == other.slots
    }
}

impl<'a> PartialOrd for StructValue<'a> {
    fn partial_cmp(&self, other: &StructValue<'a>) -> Option<Ordering> {
        if self.schema.id() != other.schema.id() {
            return None;
        }
        self.slots.partial_cmp(&other.slots)
    }
}

impl<'a> fmt::Debug for StructValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {{", self.name())?;
        for (i, (field, value)) in self.fields().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", field.name, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{FieldDesc, TypeDesc};
    use crate::schema::{IntConstraints, LenConstraints};

    fn point() -> Arc<StructSchema> {
        let desc = StructDesc::new("Point")
            .field(FieldDesc::new("x", TypeDesc::int()))
            .field(FieldDesc::new("y", TypeDesc::int()).default(Value::Int(0)));
        Arc::new(StructSchema::new(
            Arc::new(desc),
            vec![
                FieldSchema {
                    name: "x".into(),
                    wire_name: "x".into(),
                    node: Node::Int(IntConstraints::default()),
                    default: None,
                    kw_only: false,
                },
                FieldSchema {
                    name: "y".into(),
                    wire_name: "Y".into(),
                    node: Node::Int(IntConstraints::default()),
                    default: Some(DefaultValue::Value(Value::Int(0))),
                    kw_only: false,
                },
            ],
            None,
            StructOptions::default(),
        ))
    }

    #[test]
    fn construct_with_defaults() {
        let schema = point();
        let p = StructValue::new(&schema, [("x", Value::Int(3))]).unwrap();
        assert_eq!(p.get("x"), Some(&Value::Int(3)));
        assert_eq!(p.get("y"), Some(&Value::Int(0)));
        assert_eq!(p.get("z"), None);
        assert_eq!(format!("{:?}", p), "Point {x: 3, y: 0}");
    }

    #[test]
    fn construct_errors() {
        let schema = point();
        let missing = StructValue::new(&schema, [("y", Value::Int(1))]);
        assert_eq!(missing.unwrap_err(), StructError::MissingField("x".into()));
        let unknown = StructValue::new(&schema, [("x", Value::Int(1)), ("z", Value::Int(1))]);
        assert_eq!(unknown.unwrap_err().to_string(), "Unexpected field `z`");
    }

    #[test]
    fn set_and_compare() {
        let schema = point();
        let mut a = StructValue::new(&schema, [("x", Value::Int(1))]).unwrap();
        let b = StructValue::new(&schema, [("x", Value::Int(2))]).unwrap();
        assert!(a < b);
        a.set("x", Value::Int(2)).unwrap();
        assert_eq!(a, b);
        assert!(a.set("nope", Value::Null).is_err());
    }

    #[test]
    fn lookups() {
        let schema = point();
        assert_eq!(schema.field_index("Y"), Some(1));
        assert_eq!(schema.field_index("y"), None);
        assert_eq!(schema.required_len(), 1);
        assert!(!schema.is_trackable());
        assert_eq!(schema.wire_kind(), "object");
    }

    #[test]
    fn trackable_when_a_field_nests() {
        let desc = Arc::new(StructDesc::new("Bag"));
        let schema = StructSchema::new(
            desc,
            vec![FieldSchema {
                name: "items".into(),
                wire_name: "items".into(),
                node: Node::Bytes(LenConstraints::default()),
                default: None,
                kw_only: false,
            }, FieldSchema {
                name: "rest".into(),
                wire_name: "rest".into(),
                node: Node::Any,
                default: Some(DefaultValue::Value(Value::Null)),
                kw_only: false,
            }],
            None,
            StructOptions::default(),
        );
        assert!(schema.is_trackable());
    }

    #[test]
    fn tag_table() {
        let mut table = TagTable::new("type");
        assert!(table.insert(&"A".into(), StructRef(0)));
        assert!(table.insert(&LiteralValue::Int(2), StructRef(1)));
        assert!(!table.insert(&"A".into(), StructRef(2)));
        assert_eq!(table.lookup(&"A".into()), Some(StructRef(0)));
        assert_eq!(table.lookup_int(2), Some(StructRef(1)));
        assert_eq!(table.lookup_str("B"), None);
        assert_eq!(table.expected_kind(), "int | str");
    }
}
