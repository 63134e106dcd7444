//! Type descriptions: the input to the schema compiler.
//!
//! A [`TypeDesc`] says what a value should look like without committing to
//! how it is checked. The compiler turns one into a [`Schema`](crate::Schema).

use crate::{
    schema::{ArrayKind, FloatConstraints, IntConstraints, LenConstraints},
    value::Value,
};

use std::fmt;
use std::sync::Arc;

/// A string or integer constant, used by literals, enums and tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralValue {
    Str(String),
    Int(i64),
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> LiteralValue {
        LiteralValue::Str(value.to_owned())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> LiteralValue {
        LiteralValue::Str(value)
    }
}

impl From<i64> for LiteralValue {
    fn from(value: i64) -> LiteralValue {
        LiteralValue::Int(value)
    }
}

impl From<i32> for LiteralValue {
    fn from(value: i32) -> LiteralValue {
        LiteralValue::Int(value as i64)
    }
}

impl LiteralValue {
    pub fn to_value(&self) -> Value<'static> {
        match self {
            LiteralValue::Str(s) => Value::Str(s.clone().into()),
            LiteralValue::Int(i) => Value::Int(*i),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Str(s) => write!(f, "'{}'", s),
            LiteralValue::Int(i) => write!(f, "{}", i),
        }
    }
}

/// String constraints before the pattern is compiled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

impl StrConstraints {
    pub fn new() -> StrConstraints {
        StrConstraints::default()
    }

    pub fn min(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum TypeDesc {
    Any,
    Null,
    Bool,
    Int(IntConstraints),
    Float(FloatConstraints),
    Str(StrConstraints),
    Bytes(LenConstraints),
    Raw,
    /// List, set, or a homogeneous tuple of any length.
    Array {
        item: Box<TypeDesc>,
        kind: ArrayKind,
        len: LenConstraints,
    },
    Tuple(Vec<TypeDesc>),
    Map {
        key: Box<TypeDesc>,
        value: Box<TypeDesc>,
        len: LenConstraints,
    },
    Struct(Arc<StructDesc>),
    /// Refers by name to a struct that encloses this description.
    Ref(String),
    Union(Vec<TypeDesc>),
    Enum(Arc<EnumDesc>),
    Literal(Vec<LiteralValue>),
    Custom(Arc<CustomDesc>),
}

impl TypeDesc {
    pub fn int() -> TypeDesc {
        TypeDesc::Int(IntConstraints::default())
    }

    pub fn float() -> TypeDesc {
        TypeDesc::Float(FloatConstraints::default())
    }

    pub fn str() -> TypeDesc {
        TypeDesc::Str(StrConstraints::default())
    }

    pub fn bytes() -> TypeDesc {
        TypeDesc::Bytes(LenConstraints::default())
    }

    pub fn list(item: TypeDesc) -> TypeDesc {
        TypeDesc::array(item, ArrayKind::List, LenConstraints::default())
    }

    pub fn set(item: TypeDesc) -> TypeDesc {
        TypeDesc::array(item, ArrayKind::Set, LenConstraints::default())
    }

    /// A homogeneous tuple of any length.
    pub fn var_tuple(item: TypeDesc) -> TypeDesc {
        TypeDesc::array(item, ArrayKind::Tuple, LenConstraints::default())
    }

    pub fn array(item: TypeDesc, kind: ArrayKind, len: LenConstraints) -> TypeDesc {
        TypeDesc::Array { item: Box::new(item), kind, len }
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> TypeDesc {
        TypeDesc::Map {
            key: Box::new(key),
            value: Box::new(value),
            len: LenConstraints::default(),
        }
    }

    /// `t | null`.
    pub fn optional(inner: TypeDesc) -> TypeDesc {
        TypeDesc::Union(vec![inner, TypeDesc::Null])
    }

    pub fn union(members: impl IntoIterator<Item = TypeDesc>) -> TypeDesc {
        TypeDesc::Union(members.into_iter().collect())
    }

    pub fn literal<V: Into<LiteralValue>>(values: impl IntoIterator<Item = V>) -> TypeDesc {
        TypeDesc::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn reference(name: impl Into<String>) -> TypeDesc {
        TypeDesc::Ref(name.into())
    }
}

impl From<StructDesc> for TypeDesc {
    fn from(desc: StructDesc) -> TypeDesc {
        TypeDesc::Struct(Arc::new(desc))
    }
}

impl From<Arc<StructDesc>> for TypeDesc {
    fn from(desc: Arc<StructDesc>) -> TypeDesc {
        TypeDesc::Struct(desc)
    }
}

impl From<EnumDesc> for TypeDesc {
    fn from(desc: EnumDesc) -> TypeDesc {
        TypeDesc::Enum(Arc::new(desc))
    }
}

impl From<CustomDesc> for TypeDesc {
    fn from(desc: CustomDesc) -> TypeDesc {
        TypeDesc::Custom(Arc::new(desc))
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Any => f.write_str("any"),
            TypeDesc::Null => f.write_str("null"),
            TypeDesc::Bool => f.write_str("bool"),
            TypeDesc::Int(_) => f.write_str("int"),
            TypeDesc::Float(_) => f.write_str("float"),
            TypeDesc::Str(_) => f.write_str("str"),
            TypeDesc::Bytes(_) => f.write_str("bytes"),
            TypeDesc::Raw => f.write_str("raw"),
            TypeDesc::Array { item, kind, .. } => match kind {
                ArrayKind::List => write!(f, "array<{}>", item),
                ArrayKind::Set => write!(f, "set<{}>", item),
                ArrayKind::Tuple => write!(f, "tuple<{}, ...>", item),
            },
            TypeDesc::Tuple(items) => {
                f.write_str("tuple<")?;
                join(f, items, ", ")?;
                f.write_str(">")
            }
            TypeDesc::Map { key, value, .. } => write!(f, "map<{}, {}>", key, value),
            TypeDesc::Struct(desc) => f.write_str(&desc.name),
            TypeDesc::Ref(name) => f.write_str(name),
            TypeDesc::Union(members) => join(f, members, " | "),
            TypeDesc::Enum(desc) => f.write_str(&desc.name),
            TypeDesc::Literal(values) => {
                f.write_str("literal<")?;
                join(f, values, ", ")?;
                f.write_str(">")
            }
            TypeDesc::Custom(desc) => f.write_str(&desc.name),
        }
    }
}

/// How a missing field is filled in.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    Value(Value<'static>),
    /// Called once per decoded instance, for mutable defaults.
    Factory(fn() -> Value<'static>),
}

impl DefaultValue {
    pub fn get(&self) -> Value<'static> {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }

    /// Shallow check used by `omit_defaults`: scalars compare by value,
    /// containers only match when both are empty.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            DefaultValue::Value(default) => shallow_eq(default, value),
            DefaultValue::Factory(factory) => shallow_eq(&factory(), value),
        }
    }
}

fn shallow_eq(default: &Value, value: &Value) -> bool {
    match (default, value) {
        (Value::List(a), Value::List(b))
        | (Value::Tuple(a), Value::Tuple(b))
        | (Value::Set(a), Value::Set(b)) => a.is_empty() && b.is_empty(),
        (Value::Map(a), Value::Map(b)) => a.is_empty() && b.is_empty(),
        (Value::Struct(_), _) | (Value::Custom(_), _) => false,
        _ => default == value,
    }
}

#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub ty: TypeDesc,
    pub default: Option<DefaultValue>,
    pub kw_only: bool,
    /// Explicit wire name, overriding the struct's rename rule.
    pub rename: Option<String>,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> FieldDesc {
        FieldDesc {
            name: name.into(),
            ty,
            default: None,
            kw_only: false,
            rename: None,
        }
    }

    pub fn default(mut self, value: Value<'static>) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    pub fn default_factory(mut self, factory: fn() -> Value<'static>) -> Self {
        self.default = Some(DefaultValue::Factory(factory));
        self
    }

    pub fn kw_only(mut self) -> Self {
        self.kw_only = true;
        self
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Disabled,
    /// The struct's own name.
    ClassName,
    Str(String),
    Int(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rename {
    Lower,
    Upper,
    Camel,
    Pascal,
    Kebab,
}

/// Struct options. `None` means inherit from the base, or the default.
#[derive(Debug, Clone, Default)]
pub struct StructConfig {
    pub tag: Option<Tag>,
    pub tag_field: Option<String>,
    pub array_like: Option<bool>,
    pub forbid_unknown_fields: Option<bool>,
    pub omit_defaults: Option<bool>,
    pub rename: Option<Rename>,
}

#[derive(Debug, Clone)]
pub struct StructDesc {
    pub name: String,
    pub fields: Vec<FieldDesc>,
    pub base: Option<Arc<StructDesc>>,
    pub config: StructConfig,
}

impl StructDesc {
    pub fn new(name: impl Into<String>) -> StructDesc {
        StructDesc {
            name: name.into(),
            fields: Vec::new(),
            base: None,
            config: StructConfig::default(),
        }
    }

    pub fn field(mut self, field: FieldDesc) -> Self {
        self.fields.push(field);
        self
    }

    pub fn extends(mut self, base: Arc<StructDesc>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.config.tag = Some(tag);
        self
    }

    pub fn tag_field(mut self, field: impl Into<String>) -> Self {
        self.config.tag_field = Some(field.into());
        self
    }

    pub fn array_like(mut self, on: bool) -> Self {
        self.config.array_like = Some(on);
        self
    }

    pub fn forbid_unknown_fields(mut self, on: bool) -> Self {
        self.config.forbid_unknown_fields = Some(on);
        self
    }

    pub fn omit_defaults(mut self, on: bool) -> Self {
        self.config.omit_defaults = Some(on);
        self
    }

    pub fn rename(mut self, rule: Rename) -> Self {
        self.config.rename = Some(rule);
        self
    }

    /// The chain from this struct up to its root base.
    pub fn lineage(&self) -> impl Iterator<Item = &StructDesc> {
        std::iter::successors(Some(self), |desc| desc.base.as_deref())
    }

    /// Resolves an inheritable option by walking up the bases.
    pub fn inherited<T>(&self, pick: impl Fn(&StructConfig) -> Option<T>) -> Option<T> {
        self.lineage().find_map(|desc| pick(&desc.config))
    }
}

#[derive(Debug, Clone)]
pub struct EnumDesc {
    pub name: String,
    pub members: Vec<(String, LiteralValue)>,
}

impl EnumDesc {
    pub fn new<N, V>(name: impl Into<String>, members: impl IntoIterator<Item = (N, V)>) -> EnumDesc
    where
        N: Into<String>,
        V: Into<LiteralValue>,
    {
        EnumDesc {
            name: name.into(),
            members: members.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomDesc {
    pub name: String,
    pub carrier: TypeDesc,
}

impl CustomDesc {
    pub fn new(name: impl Into<String>, carrier: TypeDesc) -> CustomDesc {
        CustomDesc { name: name.into(), carrier }
    }
}
