use crate::{
    bigint::BigInt,
    desc::LiteralValue,
    structs::{StructRef, StructSchema, TagTable},
};

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A compiled schema: the root node plus every struct it reaches.
///
/// Built once by the compiler and then only read. Struct nodes refer into
/// [`Schema::structs`] by index so recursive types need no reference cycles.
#[derive(Debug)]
pub struct Schema {
    root: Node,
    structs: Vec<Arc<StructSchema>>,
}

impl Schema {
    pub fn new(root: Node, structs: Vec<Arc<StructSchema>>) -> Schema {
        Schema { root, structs }
    }

    /// A schema that accepts any value.
    pub fn any() -> Schema {
        Schema::new(Node::Any, Vec::new())
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn structs(&self) -> &[Arc<StructSchema>] {
        &self.structs
    }

    /// Resolves a struct reference produced by the compiler for this schema.
    pub fn struct_at(&self, index: StructRef) -> &Arc<StructSchema> {
        &self.structs[index.0]
    }

    pub fn find_struct(&self, name: &str) -> Option<&Arc<StructSchema>> {
        self.structs.iter().find(|s| s.name() == name)
    }
}

/// One node of the compiled schema tree.
#[derive(Debug, Clone)]
pub enum Node {
    Any,
    Null,
    Bool,
    Int(IntConstraints),
    Float(FloatConstraints),
    Str(StrSchema),
    Bytes(LenConstraints),
    /// Kept as an undecoded fragment of the input.
    Raw,
    Array(Box<ArraySchema>),
    /// Fixed-length, heterogeneous.
    Tuple(Vec<Node>),
    Map(Box<MapSchema>),
    Struct(StructRef),
    Union(Box<UnionSchema>),
    Enum(Arc<EnumSchema>),
    Literal(Arc<LiteralSchema>),
    Custom(Arc<CustomSchema>),
}

impl Node {
    /// The wire type name used in "Expected `...`" messages.
    pub fn expected(&self, schema: &Schema) -> String {
        match self {
            Node::Any | Node::Raw => "any".to_owned(),
            Node::Null => "null".to_owned(),
            Node::Bool => "bool".to_owned(),
            Node::Int(_) => "int".to_owned(),
            Node::Float(_) => "float".to_owned(),
            Node::Str(_) => "str".to_owned(),
            Node::Bytes(_) => "bytes".to_owned(),
            Node::Array(_) | Node::Tuple(_) => "array".to_owned(),
            Node::Map(_) => "object".to_owned(),
            Node::Struct(index) => schema.struct_at(*index).wire_kind().to_owned(),
            Node::Union(union) => union.expected.clone(),
            Node::Enum(schema) => schema.wire_kind().to_owned(),
            Node::Literal(literal) => literal.wire_kind().to_owned(),
            Node::Custom(custom) => custom.carrier.expected(schema),
        }
    }

    /// Whether every value this node admits is a scalar (no nested values).
    pub fn is_scalar(&self) -> bool {
        match self {
            Node::Null
            | Node::Bool
            | Node::Int(_)
            | Node::Float(_)
            | Node::Str(_)
            | Node::Bytes(_)
            | Node::Raw
            | Node::Enum(_)
            | Node::Literal(_) => true,
            Node::Union(union) => union.is_scalar(),
            Node::Any
            | Node::Array(_)
            | Node::Tuple(_)
            | Node::Map(_)
            | Node::Struct(_)
            | Node::Custom(_) => false,
        }
    }
}

fn fmt_bound<T: std::fmt::Debug>(op: &str, bound: T) -> String {
    format!("{} {:?}", op, bound)
}

/// Bounds on integer values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntConstraints {
    pub gt: Option<i64>,
    pub ge: Option<i64>,
    pub lt: Option<i64>,
    pub le: Option<i64>,
    pub multiple_of: Option<u64>,
}

impl IntConstraints {
    pub fn new() -> IntConstraints {
        IntConstraints::default()
    }

    pub fn gt(mut self, bound: i64) -> Self {
        self.gt = Some(bound);
        self
    }

    pub fn ge(mut self, bound: i64) -> Self {
        self.ge = Some(bound);
        self
    }

    pub fn lt(mut self, bound: i64) -> Self {
        self.lt = Some(bound);
        self
    }

    pub fn le(mut self, bound: i64) -> Self {
        self.le = Some(bound);
        self
    }

    pub fn multiple_of(mut self, factor: u64) -> Self {
        self.multiple_of = Some(factor);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == IntConstraints::default()
    }

    /// Checks a value, returning the violated constraint on failure.
    pub fn check(&self, value: i128) -> Result<(), String> {
        if let Some(bound) = self.gt {
            if value <= bound as i128 {
                return Err(fmt_bound(">", bound));
            }
        }
        if let Some(bound) = self.ge {
            if value < bound as i128 {
                return Err(fmt_bound(">=", bound));
            }
        }
        if let Some(bound) = self.lt {
            if value >= bound as i128 {
                return Err(fmt_bound("<", bound));
            }
        }
        if let Some(bound) = self.le {
            if value > bound as i128 {
                return Err(fmt_bound("<=", bound));
            }
        }
        if let Some(factor) = self.multiple_of {
            if factor != 0 && value.rem_euclid(factor as i128) != 0 {
                return Err(format!("that is a multiple of {}", factor));
            }
        }
        Ok(())
    }

    /// Same as [`check`](Self::check) for integers outside 128-bit range.
    pub fn check_big(&self, value: &BigInt) -> Result<(), String> {
        if let Some(small) = value.to_i128() {
            return self.check(small);
        }
        if value.is_negative() {
            if let Some(bound) = self.gt {
                return Err(fmt_bound(">", bound));
            }
            if let Some(bound) = self.ge {
                return Err(fmt_bound(">=", bound));
            }
        } else {
            if let Some(bound) = self.lt {
                return Err(fmt_bound("<", bound));
            }
            if let Some(bound) = self.le {
                return Err(fmt_bound("<=", bound));
            }
        }
        if let Some(factor) = self.multiple_of {
            if factor != 0 && value.rem_u64(factor) != 0 {
                return Err(format!("that is a multiple of {}", factor));
            }
        }
        Ok(())
    }
}

/// Bounds on float values. NaN fails every bound.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FloatConstraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl FloatConstraints {
    pub fn new() -> FloatConstraints {
        FloatConstraints::default()
    }

    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    pub fn ge(mut self, bound: f64) -> Self {
        self.ge = Some(bound);
        self
    }

    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    pub fn le(mut self, bound: f64) -> Self {
        self.le = Some(bound);
        self
    }

    pub fn multiple_of(mut self, factor: f64) -> Self {
        self.multiple_of = Some(factor);
        self
    }

    pub fn check(&self, value: f64) -> Result<(), String> {
        if let Some(bound) = self.gt {
            if !(value > bound) {
                return Err(fmt_bound(">", bound));
            }
        }
        if let Some(bound) = self.ge {
            if !(value >= bound) {
                return Err(fmt_bound(">=", bound));
            }
        }
        if let Some(bound) = self.lt {
            if !(value < bound) {
                return Err(fmt_bound("<", bound));
            }
        }
        if let Some(bound) = self.le {
            if !(value <= bound) {
                return Err(fmt_bound("<=", bound));
            }
        }
        if let Some(factor) = self.multiple_of {
            if value % factor != 0.0 {
                return Err(format!("that is a multiple of {:?}", factor));
            }
        }
        Ok(())
    }
}

/// Length bounds for strings, bytes, arrays and maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LenConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl LenConstraints {
    pub fn new() -> LenConstraints {
        LenConstraints::default()
    }

    pub fn min(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn check(&self, len: usize) -> Result<(), String> {
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("of length >= {}", min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("of length <= {}", max));
            }
        }
        Ok(())
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min_length.is_none() && self.max_length.is_none()
    }
}

/// A compiled string node. Lengths count characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct StrSchema {
    pub len: LenConstraints,
    pub pattern: Option<Regex>,
}

impl StrSchema {
    pub fn check(&self, value: &str) -> Result<(), String> {
        if !self.len.is_unconstrained() {
            self.len.check(value.chars().count())?;
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err(format!("matching regex '{}'", pattern.as_str()));
            }
        }
        Ok(())
    }
}

/// The concrete container a decoded array becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    List,
    Set,
    /// Homogeneous tuple of any length.
    Tuple,
}

#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub item: Node,
    pub kind: ArrayKind,
    pub len: LenConstraints,
}

#[derive(Debug, Clone)]
pub struct MapSchema {
    pub key: Node,
    pub value: Node,
    pub len: LenConstraints,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: LiteralValue,
}

/// A named set of string or integer values.
#[derive(Debug)]
pub struct EnumSchema {
    name: String,
    members: Vec<EnumMember>,
    by_str: HashMap<String, usize>,
    by_int: HashMap<i64, usize>,
}

impl EnumSchema {
    pub fn new(name: impl Into<String>, members: Vec<EnumMember>) -> EnumSchema {
        let mut by_str = HashMap::new();
        let mut by_int = HashMap::new();
        for (index, member) in members.iter().enumerate() {
            match &member.value {
                LiteralValue::Str(s) => {
                    by_str.entry(s.clone()).or_insert(index);
                }
                LiteralValue::Int(i) => {
                    by_int.entry(*i).or_insert(index);
                }
            }
        }
        EnumSchema { name: name.into(), members, by_str, by_int }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn member(&self, index: usize) -> &EnumMember {
        &self.members[index]
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    pub fn lookup_str(&self, value: &str) -> Option<usize> {
        self.by_str.get(value).copied()
    }

    pub fn lookup_int(&self, value: i64) -> Option<usize> {
        self.by_int.get(&value).copied()
    }

    pub fn is_int(&self) -> bool {
        !self.by_int.is_empty()
    }

    pub fn wire_kind(&self) -> &'static str {
        if self.is_int() {
            "int"
        } else {
            "str"
        }
    }
}

/// A fixed set of allowed string and/or integer values.
#[derive(Debug)]
pub struct LiteralSchema {
    values: Vec<LiteralValue>,
    strs: HashSet<String>,
    ints: HashSet<i64>,
}

impl LiteralSchema {
    pub fn new(values: Vec<LiteralValue>) -> LiteralSchema {
        let mut strs = HashSet::new();
        let mut ints = HashSet::new();
        for value in &values {
            match value {
                LiteralValue::Str(s) => {
                    strs.insert(s.clone());
                }
                LiteralValue::Int(i) => {
                    ints.insert(*i);
                }
            }
        }
        LiteralSchema { values, strs, ints }
    }

    pub fn values(&self) -> &[LiteralValue] {
        &self.values
    }

    pub fn contains_str(&self, value: &str) -> bool {
        self.strs.contains(value)
    }

    pub fn contains_int(&self, value: i64) -> bool {
        self.ints.contains(&value)
    }

    pub fn has_strs(&self) -> bool {
        !self.strs.is_empty()
    }

    pub fn has_ints(&self) -> bool {
        !self.ints.is_empty()
    }

    pub fn wire_kind(&self) -> &'static str {
        match (self.has_ints(), self.has_strs()) {
            (true, true) => "int | str",
            (true, false) => "int",
            _ => "str",
        }
    }
}

/// A user type carried on the wire as a builtin `carrier` value and
/// converted by the decode hook.
#[derive(Debug)]
pub struct CustomSchema {
    pub name: String,
    pub carrier: Node,
}

/// A union member that claims a container wire shape.
#[derive(Debug, Clone)]
pub enum ShapeMember {
    Node(Node),
    /// Structs told apart by a tag field.
    Tagged(TagTable),
}

impl ShapeMember {
    fn is_scalar(&self) -> bool {
        match self {
            ShapeMember::Node(node) => node.is_scalar(),
            ShapeMember::Tagged(_) => false,
        }
    }
}

/// A union with at most one member per wire shape.
#[derive(Debug, Clone, Default)]
pub struct UnionSchema {
    /// "int | str | null" style description of the accepted shapes.
    pub expected: String,
    pub null: bool,
    pub bool: bool,
    pub int: Option<Node>,
    pub float: Option<Node>,
    /// String-like members: str, str enums and literals, bytes.
    pub text: Option<Node>,
    pub array: Option<ShapeMember>,
    pub object: Option<ShapeMember>,
}

impl UnionSchema {
    fn is_scalar(&self) -> bool {
        [&self.int, &self.float, &self.text]
            .into_iter()
            .flatten()
            .all(Node::is_scalar)
            && self.array.as_ref().map_or(true, ShapeMember::is_scalar)
            && self.object.as_ref().map_or(true, ShapeMember::is_scalar)
    }

    /// Fills in [`expected`](Self::expected) from the populated slots.
    pub fn describe(&mut self) {
        let mut kinds: Vec<&str> = Vec::new();
        if let Some(node) = &self.int {
            kinds.push(match node {
                Node::Enum(_) => "int enum",
                _ => "int",
            });
        }
        if self.float.is_some() {
            kinds.push("float");
        }
        if let Some(node) = &self.text {
            kinds.push(match node {
                Node::Bytes(_) => "bytes",
                Node::Enum(_) => "str enum",
                _ => "str",
            });
        }
        if self.bool {
            kinds.push("bool");
        }
        if self.array.is_some() {
            kinds.push("array");
        }
        if self.object.is_some() {
            kinds.push("object");
        }
        if self.null {
            kinds.push("null");
        }
        self.expected = kinds.join(" | ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_bounds() {
        let c = IntConstraints::new().ge(0).lt(10).multiple_of(3);
        assert_eq!(c.check(3), Ok(()));
        assert_eq!(c.check(-1), Err(">= 0".to_owned()));
        assert_eq!(c.check(12), Err("< 10".to_owned()));
        assert_eq!(c.check(4), Err("that is a multiple of 3".to_owned()));
        assert!(IntConstraints::new().is_unconstrained());
    }

    #[test]
    fn big_int_bounds() {
        let c = IntConstraints::new().ge(0).le(100);
        let huge = BigInt::parse("1".repeat(45).as_str()).unwrap();
        let tiny = BigInt::parse(format!("-{}", "1".repeat(45)).as_str()).unwrap();
        assert_eq!(c.check_big(&huge), Err("<= 100".to_owned()));
        assert_eq!(c.check_big(&tiny), Err(">= 0".to_owned()));
        let even = IntConstraints::new().multiple_of(2);
        assert_eq!(even.check_big(&huge), Err("that is a multiple of 2".to_owned()));
    }

    #[test]
    fn float_bounds() {
        let c = FloatConstraints::new().gt(0.0).le(1.0);
        assert_eq!(c.check(0.5), Ok(()));
        assert_eq!(c.check(0.0), Err("> 0.0".to_owned()));
        assert_eq!(c.check(f64::NAN), Err("> 0.0".to_owned()));
        assert_eq!(c.check(1.5), Err("<= 1.0".to_owned()));
        let half = FloatConstraints::new().multiple_of(0.5);
        assert_eq!(half.check(1.5), Ok(()));
        assert_eq!(half.check(1.2), Err("that is a multiple of 0.5".to_owned()));
    }

    #[test]
    fn str_constraints() {
        let s = StrSchema {
            len: LenConstraints::new().min(2).max(4),
            pattern: Some(Regex::new("^[a-z]+$").unwrap()),
        };
        assert_eq!(s.check("abc"), Ok(()));
        assert_eq!(s.check("a"), Err("of length >= 2".to_owned()));
        assert_eq!(s.check("ééééé"), Err("of length <= 4".to_owned()));
        assert_eq!(s.check("ab1"), Err("matching regex '^[a-z]+$'".to_owned()));
    }

    #[test]
    fn enum_lookup() {
        let e = EnumSchema::new(
            "Color",
            vec![
                EnumMember { name: "RED".into(), value: LiteralValue::Str("red".into()) },
                EnumMember { name: "BLUE".into(), value: LiteralValue::Str("blue".into()) },
            ],
        );
        assert_eq!(e.lookup_str("blue"), Some(1));
        assert_eq!(e.lookup_str("green"), None);
        assert_eq!(e.find("RED"), Some(0));
        assert_eq!(e.wire_kind(), "str");
    }

    #[test]
    fn literal_kinds() {
        let l = LiteralSchema::new(vec![LiteralValue::Int(1), LiteralValue::Str("a".into())]);
        assert!(l.contains_int(1));
        assert!(l.contains_str("a"));
        assert!(!l.contains_str("b"));
        assert_eq!(l.wire_kind(), "int | str");
    }
}
