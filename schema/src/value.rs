use crate::{
    bigint::BigInt,
    desc::LiteralValue,
    schema::EnumSchema,
    structs::StructValue,
};

use std::any::Any;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::Arc;

/// This type holds dynamic keel data.
///
/// Values are what the decoders produce and what the encoders consume.
/// Strings, bytes and raw fragments may borrow from the input buffer, so a
/// decoded `Value<'a>` can't outlive the bytes it was parsed from; call
/// [into_owned](#method.into_owned) to detach it.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int(i64),
    /// Only for integers above `i64::MAX`.
    UInt(u64),
    /// Integers outside 64-bit range.
    BigInt(BigInt),
    Float(f64),
    Str(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    List(Vec<Value<'a>>),
    Tuple(Vec<Value<'a>>),
    Set(Vec<Value<'a>>),
    /// Insertion ordered.
    Map(Vec<(Value<'a>, Value<'a>)>),
    Struct(StructValue<'a>),
    Enum(EnumValue),
    /// A MessagePack extension nobody claimed.
    Ext(Ext<'a>),
    Raw(RawFragment<'a>),
    Custom(Custom),
}

/// A member of a compiled enum. Members of enums with the same name compare
/// equal by position, so values survive recompiling the schema.
#[derive(Clone)]
pub struct EnumValue {
    schema: Arc<EnumSchema>,
    index: usize,
}

impl EnumValue {
    pub fn new(schema: Arc<EnumSchema>, index: usize) -> EnumValue {
        EnumValue { schema, index }
    }

    /// Looks a member up by name.
    pub fn by_name(schema: &Arc<EnumSchema>, name: &str) -> Option<EnumValue> {
        schema.find(name).map(|index| EnumValue::new(schema.clone(), index))
    }

    pub fn schema(&self) -> &Arc<EnumSchema> {
        &self.schema
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.schema.member(self.index).name
    }

    /// The value written on the wire.
    pub fn value(&self) -> &LiteralValue {
        &self.schema.member(self.index).value
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &EnumValue) -> bool {
        self.index == other.index
            && (Arc::ptr_eq(&self.schema, &other.schema) || self.schema.name() == other.schema.name())
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}::{}", self.schema.name(), self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ext<'a> {
    pub code: i8,
    pub data: Cow<'a, [u8]>,
}

/// Already-encoded bytes, copied through verbatim on encode.
#[derive(Clone, PartialEq)]
pub struct RawFragment<'a>(Cow<'a, [u8]>);

impl<'a> RawFragment<'a> {
    pub fn new(bytes: impl Into<Cow<'a, [u8]>>) -> RawFragment<'a> {
        RawFragment(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_owned(self) -> RawFragment<'static> {
        RawFragment(Cow::Owned(self.0.into_owned()))
    }
}

impl<'a> fmt::Debug for RawFragment<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "Raw({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// User data that the engines only pass to hooks.
pub trait CustomData: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn CustomData) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> CustomData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn CustomData) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

#[derive(Clone)]
pub struct Custom(Arc<dyn CustomData>);

impl Custom {
    pub fn new<T: CustomData>(data: T) -> Custom {
        Custom(Arc::new(data))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().as_any().downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.as_ref().type_name()
    }
}

impl PartialEq for Custom {
    fn eq(&self, other: &Custom) -> bool {
        self.0.as_ref().dyn_eq(other.0.as_ref())
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        fmt::Debug::fmt(self.0.as_ref(), f)
    }
}

impl<'a> Value<'a> {
    /// The wire-level kind, as used in "got `...`" messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) | Value::BigInt(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) | Value::Tuple(_) | Value::Set(_) => "array",
            Value::Map(_) => "object",
            Value::Struct(s) => s.schema().wire_kind(),
            Value::Enum(e) => match e.value() {
                LiteralValue::Str(_) => "str",
                LiteralValue::Int(_) => "int",
            },
            Value::Ext(_) => "ext",
            Value::Raw(_) => "raw",
            Value::Custom(_) => "custom",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// A convenience method to extract the value out of an [Int](#variant.Int).
    /// Returns `0` for other value kinds.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Int(value) => value,
            _ => 0,
        }
    }

    /// Returns the value out of an [Int](#variant.Int) or [UInt](#variant.UInt)
    /// if it fits in a `u64`, `0` otherwise.
    pub fn as_uint(&self) -> u64 {
        match *self {
            Value::UInt(value) => value,
            Value::Int(value) => u64::try_from(value).unwrap_or(0),
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Float](#variant.Float).
    /// Returns `0.0` for other value kinds.
    pub fn as_float(&self) -> f64 {
        match *self {
            Value::Float(value) => value,
            _ => 0.0,
        }
    }

    /// Returns the text of a [Str](#variant.Str) or a string enum member.
    /// Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(value) => value,
            Value::Enum(value) => match value.value() {
                LiteralValue::Str(s) => s,
                LiteralValue::Int(_) => "",
            },
            _ => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Bytes(value) => value,
            _ => &[],
        }
    }

    /// The elements of a list, tuple or set. Returns an empty slice for
    /// other value kinds.
    pub fn as_array(&self) -> &[Value<'a>] {
        match self {
            Value::List(values) | Value::Tuple(values) | Value::Set(values) => values,
            _ => &[],
        }
    }

    pub fn as_map(&self) -> &[(Value<'a>, Value<'a>)] {
        match self {
            Value::Map(entries) => entries,
            _ => &[],
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue<'a>> {
        match self {
            Value::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Length of a sequence or map. Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match self {
            Value::List(values) | Value::Tuple(values) | Value::Set(values) => values.len(),
            Value::Map(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to a [List](#variant.List). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::List(values) = self {
            values.push(value);
        }
    }

    /// Reads a struct field by name, or a map entry by string key. Returns
    /// `None` for other value kinds or if the field isn't present.
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        match self {
            Value::Struct(value) => value.get(name),
            Value::Map(entries) => entries
                .iter()
                .find(|(key, _)| matches!(key, Value::Str(k) if k == name))
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Updates a struct field or a map entry with a string key. Does nothing
    /// for other value kinds or for unknown struct fields.
    pub fn set(&mut self, name: &str, value: Value<'a>) {
        match self {
            Value::Struct(fields) => {
                if let Some(slot) = fields.get_mut(name) {
                    *slot = value;
                }
            }
            Value::Map(entries) => {
                match entries
                    .iter_mut()
                    .find(|(key, _)| matches!(key, Value::Str(k) if k == name))
                {
                    Some((_, slot)) => *slot = value,
                    None => entries.push((Value::Str(Cow::Owned(name.to_owned())), value)),
                }
            }
            _ => {}
        }
    }

    /// Removes a map entry with a string key. Does nothing for other value
    /// kinds.
    pub fn remove(&mut self, name: &str) {
        if let Value::Map(entries) = self {
            entries.retain(|(key, _)| !matches!(key, Value::Str(k) if k == name));
        }
    }

    /// The narrowest integer variant holding `value`.
    pub fn from_i128(value: i128) -> Value<'static> {
        if let Ok(v) = i64::try_from(value) {
            Value::Int(v)
        } else if let Ok(v) = u64::try_from(value) {
            Value::UInt(v)
        } else {
            Value::BigInt(BigInt::from_i128(value))
        }
    }

    /// Like [from_i128](#method.from_i128), for arbitrary-precision input.
    pub fn from_bigint(value: BigInt) -> Value<'static> {
        match value.to_i128() {
            Some(v) => Value::from_i128(v),
            None => Value::BigInt(value),
        }
    }

    /// Integer kinds as `i128`; `None` for everything else, including
    /// integers that don't fit.
    pub fn to_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v as i128),
            Value::UInt(v) => Some(*v as i128),
            Value::BigInt(v) => v.to_i128(),
            _ => None,
        }
    }

    /// Builds a set, dropping repeated elements.
    pub fn set_of(items: Vec<Value<'a>>) -> Value<'a> {
        Value::Set(dedup_items(items))
    }

    /// Builds a map. A repeated key keeps its first position and last value.
    pub fn map_of(entries: Vec<(Value<'a>, Value<'a>)>) -> Value<'a> {
        Value::Map(dedup_entries(entries))
    }

    /// Detaches the value from the buffer it borrows from.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(v),
            Value::Int(v) => Value::Int(v),
            Value::UInt(v) => Value::UInt(v),
            Value::BigInt(v) => Value::BigInt(v),
            Value::Float(v) => Value::Float(v),
            Value::Str(v) => Value::Str(Cow::Owned(v.into_owned())),
            Value::Bytes(v) => Value::Bytes(Cow::Owned(v.into_owned())),
            Value::List(v) => Value::List(owned_items(v)),
            Value::Tuple(v) => Value::Tuple(owned_items(v)),
            Value::Set(v) => Value::Set(owned_items(v)),
            Value::Map(v) => Value::Map(
                v.into_iter()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            ),
            Value::Struct(v) => Value::Struct(v.into_owned()),
            Value::Enum(v) => Value::Enum(v),
            Value::Ext(v) => Value::Ext(Ext {
                code: v.code,
                data: Cow::Owned(v.data.into_owned()),
            }),
            Value::Raw(v) => Value::Raw(v.into_owned()),
            Value::Custom(v) => Value::Custom(v),
        }
    }

    /// Total order used for deterministic output: values of one kind by
    /// [PartialOrd](#impl-PartialOrd-for-Value), different kinds by kind.
    pub fn cmp_for_sort(&self, other: &Value<'a>) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.kind_rank().cmp(&other.kind_rank()))
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::UInt(_) | Value::BigInt(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Bytes(_) => 4,
            Value::List(_) => 5,
            Value::Tuple(_) => 6,
            Value::Set(_) => 7,
            Value::Map(_) => 8,
            Value::Struct(_) => 9,
            Value::Enum(_) => 10,
            Value::Ext(_) => 11,
            Value::Raw(_) => 12,
            Value::Custom(_) => 13,
        }
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::UInt(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            // -0.0 == 0.0
            Value::Float(v) => (v + 0.0).to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::List(v) | Value::Tuple(v) | Value::Set(v) => {
                v.len().hash(state);
                v.iter().for_each(|item| item.hash_into(state));
            }
            Value::Map(v) => {
                v.len().hash(state);
                for (key, value) in v {
                    key.hash_into(state);
                    value.hash_into(state);
                }
            }
            Value::Struct(v) => {
                v.schema().id().hash(state);
                v.slots().iter().for_each(|item| item.hash_into(state));
            }
            Value::Enum(v) => v.index().hash(state),
            Value::Ext(v) => {
                v.code.hash(state);
                v.data.hash(state);
            }
            Value::Raw(v) => v.bytes().hash(state),
            Value::Custom(v) => v.type_name().hash(state),
        }
    }

    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_into(&mut hasher);
        hasher.finish()
    }
}

fn owned_items(items: Vec<Value>) -> Vec<Value<'static>> {
    items.into_iter().map(Value::into_owned).collect()
}

/// Drops repeated elements, keeping the first of each.
pub fn dedup_items(items: Vec<Value>) -> Vec<Value> {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        let bucket = buckets.entry(item.fingerprint()).or_default();
        if bucket.iter().any(|&i| out[i] == item) {
            continue;
        }
        bucket.push(out.len());
        out.push(item);
    }
    out
}

/// Drops repeated keys. Each key keeps its first position and last value.
pub fn dedup_entries<'a>(entries: Vec<(Value<'a>, Value<'a>)>) -> Vec<(Value<'a>, Value<'a>)> {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut out: Vec<(Value<'a>, Value<'a>)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let bucket = buckets.entry(key.fingerprint()).or_default();
        if let Some(&i) = bucket.iter().find(|&&i| out[i].0 == key) {
            out[i].1 = value;
            continue;
        }
        bucket.push(out.len());
        out.push((key, value));
    }
    out
}

fn cmp_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Float(x), _) => x.partial_cmp(&number_as_f64(b)?),
        (_, Value::Float(y)) => number_as_f64(a)?.partial_cmp(y),
        (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
        (Value::BigInt(x), _) => Some(x.cmp(&BigInt::from_i128(b.to_i128()?))),
        (_, Value::BigInt(y)) => Some(BigInt::from_i128(a.to_i128()?).cmp(y)),
        _ => a.to_i128()?.partial_cmp(&b.to_i128()?),
    }
}

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::UInt(v) => Some(*v as f64),
        Value::BigInt(v) => Some(v.to_f64()),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

impl<'a> PartialOrd for Value<'a> {
    /// Compares values of the same kind; numbers compare across
    /// int and float. Different kinds are unordered.
    fn partial_cmp(&self, other: &Value<'a>) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.partial_cmp(b),
            (Value::List(a), Value::List(b))
            | (Value::Tuple(a), Value::Tuple(b))
            | (Value::Set(a), Value::Set(b)) => a.partial_cmp(b),
            (Value::Map(a), Value::Map(b)) => a.partial_cmp(b),
            (Value::Struct(a), Value::Struct(b)) => a.partial_cmp(b),
            (Value::Enum(a), Value::Enum(b)) if a.schema().name() == b.schema().name() => {
                a.value().partial_cmp(b.value())
            }
            (Value::Ext(a), Value::Ext(b)) => (a.code, &a.data).partial_cmp(&(b.code, &b.data)),
            (Value::Raw(a), Value::Raw(b)) => a.bytes().partial_cmp(b.bytes()),
            _ if self.kind_rank() == 2 && other.kind_rank() == 2 => cmp_numbers(self, other),
            _ => None,
        }
    }
}

impl<'a> Index<usize> for Value<'a> {
    type Output = Value<'a>;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't a sequence or if the provided index
    /// is out of bounds.
    fn index(&self, index: usize) -> &Value<'a> {
        match self {
            Value::List(values) | Value::Tuple(values) | Value::Set(values) => &values[index],
            _ => panic!("cannot index a `{}` value", self.kind_name()),
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{:?}", value),
            Value::Int(value) => write!(f, "{:?}", value),
            Value::UInt(value) => write!(f, "{:?}", value),
            Value::BigInt(value) => write!(f, "{:?}", value),
            Value::Float(value) => write!(f, "{:?}", value),
            Value::Str(value) => write!(f, "{:?}", value),
            Value::Bytes(value) => write!(f, "b\"{}\"", value.escape_ascii()),
            Value::List(values) => write!(f, "{:?}", values),
            Value::Tuple(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", value)?;
                }
                write!(f, ")")
            }
            Value::Set(values) => f.debug_set().entries(values).finish(),
            Value::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Struct(value) => write!(f, "{:?}", value),
            Value::Enum(value) => write!(f, "{:?}", value),
            Value::Ext(value) => write!(f, "Ext({}, b\"{}\")", value.code, value.data.escape_ascii()),
            Value::Raw(value) => write!(f, "{:?}", value),
            Value::Custom(value) => write!(f, "{:?}", value),
        }
    }
}

impl From<bool> for Value<'static> {
    fn from(value: bool) -> Value<'static> {
        Value::Bool(value)
    }
}

impl From<i64> for Value<'static> {
    fn from(value: i64) -> Value<'static> {
        Value::Int(value)
    }
}

impl From<i32> for Value<'static> {
    fn from(value: i32) -> Value<'static> {
        Value::Int(value as i64)
    }
}

impl From<u64> for Value<'static> {
    fn from(value: u64) -> Value<'static> {
        Value::from_i128(value as i128)
    }
}

impl From<f64> for Value<'static> {
    fn from(value: f64) -> Value<'static> {
        Value::Float(value)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(value: &'a str) -> Value<'a> {
        Value::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Value<'static> {
    fn from(value: String) -> Value<'static> {
        Value::Str(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(value: &'a [u8]) -> Value<'a> {
        Value::Bytes(Cow::Borrowed(value))
    }
}

impl From<Vec<u8>> for Value<'static> {
    fn from(value: Vec<u8>) -> Value<'static> {
        Value::Bytes(Cow::Owned(value))
    }
}

impl<'a> From<Vec<Value<'a>>> for Value<'a> {
    fn from(values: Vec<Value<'a>>) -> Value<'a> {
        Value::List(values)
    }
}

impl<'a> From<StructValue<'a>> for Value<'a> {
    fn from(value: StructValue<'a>) -> Value<'a> {
        Value::Struct(value)
    }
}

impl From<EnumValue> for Value<'static> {
    fn from(value: EnumValue) -> Value<'static> {
        Value::Enum(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumMember;

    fn color() -> Arc<EnumSchema> {
        Arc::new(EnumSchema::new(
            "Color",
            vec![
                EnumMember { name: "RED".into(), value: "red".into() },
                EnumMember { name: "GREEN".into(), value: "green".into() },
            ],
        ))
    }

    #[test]
    fn value_basic() {
        let color = color();
        let value = Value::List(vec![
            Value::Bool(true),
            Value::Int(-1),
            Value::UInt(u64::MAX),
            Value::Float(0.5),
            Value::from("abc"),
            Value::from(vec![1u8, 2]),
            Value::Enum(EnumValue::new(color.clone(), 1)),
            Value::Map(vec![(Value::from("key1"), Value::from("value1"))]),
            Value::Null,
        ]);

        assert_eq!(value.len(), 9);

        assert_eq!(value[0], Value::Bool(true));
        assert_eq!(value[1], Value::Int(-1));
        assert_eq!(value[2], Value::UInt(u64::MAX));
        assert_eq!(value[3], Value::Float(0.5));
        assert_eq!(value[4], Value::Str("abc".into()));
        assert_eq!(value[6], Value::Enum(EnumValue::by_name(&color, "GREEN").unwrap()));

        assert_eq!(value[0].as_bool(), true);
        assert_eq!(value[1].as_int(), -1);
        assert_eq!(value[2].as_uint(), u64::MAX);
        assert_eq!(value[3].as_float(), 0.5);
        assert_eq!(value[4].as_str(), "abc");
        assert_eq!(value[5].as_bytes(), &[1, 2]);
        assert_eq!(value[6].as_str(), "green");
        assert_eq!(value.get("key1"), None);
        assert_eq!(value[7].get("key1"), Some(&Value::from("value1")));

        assert_eq!(
            format!("{:?}", value),
            "[true, -1, 18446744073709551615, 0.5, \"abc\", b\"\\x01\\x02\", Color::GREEN, {\"key1\": \"value1\"}, null]"
        );
    }

    #[test]
    fn value_push() {
        let mut value = Value::List(vec![]);
        assert_eq!(value.len(), 0);

        value.push(Value::Int(123));
        assert_eq!(value.len(), 1);
        assert_eq!(value[0], Value::Int(123));

        value.push(Value::Int(456));
        assert_eq!(value.len(), 2);
        assert_eq!(value[1], Value::Int(456));
    }

    #[test]
    fn value_set_and_remove() {
        let mut value = Value::Map(vec![]);
        assert_eq!(value.get("x"), None);

        value.set("x", Value::Int(123));
        value.set("y", Value::Int(456));
        value.set("x", Value::Int(789));
        assert_eq!(value.get("x"), Some(&Value::Int(789)));
        assert_eq!(value.get("y"), Some(&Value::Int(456)));
        assert_eq!(value.len(), 2);

        value.remove("x");
        assert_eq!(value.get("x"), None);
        assert_eq!(value.get("y"), Some(&Value::Int(456)));
    }

    #[test]
    fn narrowest_integers() {
        assert_eq!(Value::from_i128(-5), Value::Int(-5));
        assert_eq!(Value::from_i128(u64::MAX as i128), Value::UInt(u64::MAX));
        assert_eq!(Value::from(5u64), Value::Int(5));
        let big = BigInt::parse("-9223372036854775809").unwrap();
        assert_eq!(Value::from_bigint(big.clone()), Value::BigInt(big));
        assert_eq!(
            Value::from_bigint(BigInt::parse("42").unwrap()),
            Value::Int(42)
        );
    }

    #[test]
    fn dedup() {
        let set = Value::set_of(vec![
            Value::Int(1),
            Value::Float(0.0),
            Value::Int(1),
            Value::Float(-0.0),
            Value::from("a"),
        ]);
        assert_eq!(format!("{:?}", set), "{1, 0.0, \"a\"}");

        let map = Value::map_of(vec![
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
            (Value::from("a"), Value::Int(3)),
        ]);
        assert_eq!(format!("{:?}", map), "{\"a\": 3, \"b\": 2}");
    }

    #[test]
    fn ordering() {
        assert!(Value::Int(1) < Value::Float(1.5));
        assert!(Value::UInt(u64::MAX) > Value::Int(0));
        assert!(Value::BigInt(BigInt::parse("-99999999999999999999").unwrap()) < Value::Int(i64::MIN));
        assert!(Value::from("a") < Value::from("b"));
        assert_eq!(Value::from("a").partial_cmp(&Value::Int(1)), None);
        assert_eq!(Value::from("a").cmp_for_sort(&Value::Int(1)), Ordering::Greater);
        assert!(Value::List(vec![Value::Int(1)]) < Value::List(vec![Value::Int(1), Value::Int(0)]));
    }

    #[test]
    fn custom_equality() {
        #[derive(Debug, PartialEq)]
        struct Point(i32, i32);

        let a = Value::Custom(Custom::new(Point(1, 2)));
        assert_eq!(a, Value::Custom(Custom::new(Point(1, 2))));
        assert_ne!(a, Value::Custom(Custom::new(Point(2, 1))));
        assert_ne!(a, Value::Custom(Custom::new(7i32)));
        if let Value::Custom(c) = &a {
            assert_eq!(c.downcast_ref::<Point>(), Some(&Point(1, 2)));
        }
        assert_eq!(format!("{:?}", a), "Point(1, 2)");
    }

    #[test]
    fn into_owned_detaches() {
        let text = String::from("borrowed");
        let owned = {
            let value = Value::List(vec![Value::from(text.as_str())]);
            value.into_owned()
        };
        drop(text);
        assert_eq!(owned[0].as_str(), "borrowed");
    }

    // `get` must return `&Value<'a>`, not `&Value<'_>` tied to `&self`, or
    // iterating over a `Value<'static>`'s children fails to borrow-check.
    #[test]
    fn value_get_keeps_input_lifetime() {
        fn use_item<'a>(_: &'a Value<'static>) {}

        fn use_items(value: Value<'static>) {
            if let Some(Value::List(items)) = value.get("items") {
                for item in items {
                    use_item(item);
                }
            }
        }

        use_items(Value::Map(vec![]));
    }
}
