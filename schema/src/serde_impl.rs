//! serde support for [`Value`], so generic values can be handed to any
//! serde-based format.

use crate::{bigint::BigInt, desc::LiteralValue, structs::StructValue, value::Value};

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

impl<'a> Serialize for Value<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::BigInt(v) => match v.to_i128() {
                Some(small) => serializer.serialize_i128(small),
                None => serializer.serialize_str(&v.to_string()),
            },
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Struct(value) => serialize_struct(value, serializer),
            Value::Enum(value) => match value.value() {
                LiteralValue::Str(s) => serializer.serialize_str(s),
                LiteralValue::Int(i) => serializer.serialize_i64(*i),
            },
            Value::Ext(ext) => Err(S::Error::custom(format_args!(
                "cannot serialize MessagePack extension {}",
                ext.code
            ))),
            Value::Raw(_) => Err(S::Error::custom("cannot serialize a raw fragment")),
            Value::Custom(custom) => Err(S::Error::custom(format_args!(
                "cannot serialize custom type `{}`",
                custom.type_name()
            ))),
        }
    }
}

fn serialize_struct<S: Serializer>(value: &StructValue, serializer: S) -> Result<S::Ok, S::Error> {
    let schema = value.schema();
    let omit = schema.options().omit_defaults;
    let fields: Vec<_> = value
        .fields()
        .filter(|(field, v)| !(omit && field.default.as_ref().is_some_and(|d| d.matches(v))))
        .collect();
    let tag = schema.tag();
    let mut map = serializer.serialize_map(Some(fields.len() + tag.is_some() as usize))?;
    if let Some(tag) = tag {
        match &tag.value {
            LiteralValue::Str(s) => map.serialize_entry(&tag.field, s)?,
            LiteralValue::Int(i) => map.serialize_entry(&tag.field, i)?,
        }
    }
    for (field, v) in fields {
        map.serialize_entry(&field.wire_name, v)?;
    }
    map.end()
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value<'static>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value<'static>, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value<'static>, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value<'static>, D::Error> {
        Value::deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value<'static>, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value<'static>, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value<'static>, E> {
        Ok(Value::from(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Value<'static>, E> {
        Ok(Value::from_i128(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Value<'static>, E> {
        match i128::try_from(v) {
            Ok(v) => Ok(Value::from_i128(v)),
            Err(_) => BigInt::parse(&v.to_string())
                .map(Value::BigInt)
                .ok_or_else(|| E::custom("integer out of range")),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value<'static>, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value<'static>, E> {
        Ok(Value::from(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value<'static>, E> {
        Ok(Value::from(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value<'static>, E> {
        Ok(Value::from(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value<'static>, E> {
        Ok(Value::from(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value<'static>, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value<'static>, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(4096));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(Value::map_of(entries))
    }
}

/// Produces only generic values: null, bool, numbers, str, bytes, lists
/// and maps.
impl<'de> Deserialize<'de> for Value<'static> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value<'static>, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
