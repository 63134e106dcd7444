use crate::{error::CompileError, rename, verifier};
use keel_schema::{
    ArraySchema, CustomSchema, EnumMember, EnumSchema, FieldSchema,
    FloatConstraints, IntConstraints, LenConstraints, LiteralSchema, LiteralValue, MapSchema,
    Node, Schema, StrConstraints, StrSchema, StructDesc, StructOptions, StructRef, StructSchema,
    StructTag, Tag, TypeDesc,
};

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TAG_FIELD: &str = "type";

/// Compile a type description into an immutable [`Schema`].
///
/// Returns `Err(CompileError)` if the description is invalid or ambiguous:
/// a bad constraint, an undefined reference, a struct whose fields can't be
/// laid out, or a union with two members claiming the same wire shape.
pub fn compile(desc: &TypeDesc) -> Result<Schema, CompileError> {
    let mut compiler = Compiler::default();
    let root = compiler.node(desc)?;
    let structs = compiler.finish();
    debug!(ty = %desc, structs = structs.len(), "compiled schema");
    Ok(Schema::new(root, structs))
}

/// What a union needs to know about a struct before its fields are compiled.
#[derive(Debug, Clone)]
pub(crate) struct StructHeader {
    pub name:    String,
    pub tag:     Option<StructTag>,
    pub options: StructOptions,
}

#[derive(Default)]
pub(crate) struct Compiler {
    by_desc:  HashMap<usize, StructRef>,
    headers:  Vec<StructHeader>,
    compiled: Vec<Option<Arc<StructSchema>>>,
    enclosing: Vec<StructRef>,
    enums:    HashMap<usize, Arc<EnumSchema>>,
}

impl Compiler {
    pub(crate) fn header(&self, index: StructRef) -> &StructHeader {
        &self.headers[index.0]
    }

    fn finish(self) -> Vec<Arc<StructSchema>> {
        self.compiled.into_iter().flatten().collect()
    }

    pub(crate) fn node(&mut self, desc: &TypeDesc) -> Result<Node, CompileError> {
        Ok(match desc {
            TypeDesc::Any => Node::Any,
            TypeDesc::Null => Node::Null,
            TypeDesc::Bool => Node::Bool,
            TypeDesc::Int(c) => Node::Int(check_int(c)?),
            TypeDesc::Float(c) => Node::Float(check_float(c)?),
            TypeDesc::Str(c) => Node::Str(str_schema(c)?),
            TypeDesc::Bytes(len) => Node::Bytes(check_len("bytes", len)?),
            TypeDesc::Raw => Node::Raw,
            TypeDesc::Array { item, kind, len } => {
                let item_node = self.node(item)?;
                if *kind == keel_schema::ArrayKind::Set {
                    check_hashable(&item_node, item)?;
                }
                Node::Array(Box::new(ArraySchema {
                    item: item_node,
                    kind: *kind,
                    len: check_len("array", len)?,
                }))
            }
            TypeDesc::Tuple(items) => Node::Tuple(
                items
                    .iter()
                    .map(|item| self.node(item))
                    .collect::<Result<_, _>>()?,
            ),
            TypeDesc::Map { key, value, len } => {
                let key_node = self.node(key)?;
                check_map_key(&key_node, key)?;
                Node::Map(Box::new(MapSchema {
                    key: key_node,
                    value: self.node(value)?,
                    len: check_len("object", len)?,
                }))
            }
            TypeDesc::Struct(desc) => Node::Struct(self.struct_ref(desc)?),
            TypeDesc::Ref(name) => Node::Struct(self.resolve(name)?),
            TypeDesc::Union(members) => verifier::union(self, desc, members)?,
            TypeDesc::Enum(desc) => {
                let key = Arc::as_ptr(desc) as usize;
                if let Some(schema) = self.enums.get(&key) {
                    return Ok(Node::Enum(schema.clone()));
                }
                let mut kinds = desc.members.iter().map(|(_, v)| matches!(v, LiteralValue::Int(_)));
                if let Some(first) = kinds.next() {
                    if kinds.any(|is_int| is_int != first) {
                        return Err(CompileError::MixedEnum(desc.name.clone()));
                    }
                }
                let members = desc
                    .members
                    .iter()
                    .map(|(name, value)| EnumMember { name: name.clone(), value: value.clone() })
                    .collect();
                let schema = Arc::new(EnumSchema::new(desc.name.clone(), members));
                self.enums.insert(key, schema.clone());
                Node::Enum(schema)
            }
            TypeDesc::Literal(values) => {
                if values.is_empty() {
                    return Err(CompileError::InvalidConstraint {
                        ty: desc.to_string(),
                        message: "a literal needs at least one value".to_owned(),
                    });
                }
                Node::Literal(Arc::new(LiteralSchema::new(values.clone())))
            }
            TypeDesc::Custom(custom) => Node::Custom(Arc::new(CustomSchema {
                name: custom.name.clone(),
                carrier: self.node(&custom.carrier)?,
            })),
        })
    }

    /// Refers by name to an enclosing struct, or any struct seen so far.
    fn resolve(&self, name: &str) -> Result<StructRef, CompileError> {
        self.enclosing
            .iter()
            .rev()
            .copied()
            .find(|r| self.headers[r.0].name == name)
            .or_else(|| {
                self.headers
                    .iter()
                    .position(|h| h.name == name)
                    .map(StructRef)
            })
            .ok_or_else(|| CompileError::UndefinedType(name.to_owned()))
    }

    /// Registers the struct before compiling its fields so recursive
    /// references and unions can see its header.
    fn struct_ref(&mut self, desc: &Arc<StructDesc>) -> Result<StructRef, CompileError> {
        let key = Arc::as_ptr(desc) as usize;
        if let Some(&index) = self.by_desc.get(&key) {
            return Ok(index);
        }

        let header = resolve_header(desc);
        let index = StructRef(self.headers.len());
        self.by_desc.insert(key, index);
        self.headers.push(header.clone());
        self.compiled.push(None);

        self.enclosing.push(index);
        let fields = self.resolve_fields(desc, &header);
        self.enclosing.pop();
        let fields = fields?;

        debug!(
            name = %desc.name,
            fields = fields.len(),
            array_like = header.options.array_like,
            tag = ?header.tag.as_ref().map(|t| &t.value),
            "compiled struct"
        );
        let schema = StructSchema::new(desc.clone(), fields, header.tag, header.options);
        self.compiled[index.0] = Some(Arc::new(schema));
        Ok(index)
    }

    fn resolve_fields(
        &mut self,
        desc: &StructDesc,
        header: &StructHeader,
    ) -> Result<Vec<FieldSchema>, CompileError> {
        // Base fields first; an override keeps its base's position.
        let mut merged: Vec<&keel_schema::FieldDesc> = Vec::new();
        let lineage: Vec<&StructDesc> = desc.lineage().collect();
        for level in lineage.iter().rev() {
            let start = merged.len();
            for field in &level.fields {
                if level.fields.iter().filter(|f| f.name == field.name).count() > 1 {
                    return Err(CompileError::DuplicateField {
                        name: level.name.clone(),
                        field: field.name.clone(),
                    });
                }
                match merged[..start].iter().position(|f| f.name == field.name) {
                    Some(at) => merged[at] = field,
                    None => merged.push(field),
                }
            }
        }

        let (positional, kw_only): (Vec<_>, Vec<_>) =
            merged.into_iter().partition(|field| !field.kw_only);

        let mut seen_optional = false;
        for field in &positional {
            if field.default.is_some() {
                seen_optional = true;
            } else if seen_optional {
                return Err(CompileError::RequiredAfterOptional {
                    name: desc.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let rule = desc.inherited(|c| c.rename);
        let mut wire_names = HashSet::new();
        let mut fields = Vec::with_capacity(positional.len() + kw_only.len());
        for field in positional.into_iter().chain(kw_only) {
            let wire_name = match (&field.rename, rule) {
                (Some(explicit), _) => explicit.clone(),
                (None, Some(rule)) => rename::apply(rule, &field.name),
                (None, None) => field.name.clone(),
            };
            if !wire_names.insert(wire_name.clone()) {
                return Err(CompileError::DuplicateField {
                    name: desc.name.clone(),
                    field: wire_name,
                });
            }
            if let Some(tag) = &header.tag {
                if tag.field == wire_name {
                    return Err(CompileError::TagFieldCollision {
                        name: desc.name.clone(),
                        field: wire_name,
                    });
                }
            }
            fields.push(FieldSchema {
                name: field.name.clone(),
                wire_name,
                node: self.node(&field.ty)?,
                default: field.default.clone(),
                kw_only: field.kw_only,
            });
        }
        Ok(fields)
    }
}

/// Resolves the tag and options, walking up the bases. Explicit tag values
/// belong to the struct that declares them; subclasses fall back to their
/// own name.
fn resolve_header(desc: &StructDesc) -> StructHeader {
    let tag = match &desc.config.tag {
        Some(tag) => Some(tag.clone()),
        None => desc
            .lineage()
            .skip(1)
            .find_map(|base| base.config.tag.clone())
            .map(|tag| match tag {
                Tag::Str(_) | Tag::Int(_) => Tag::ClassName,
                other => other,
            }),
    };
    let tag_field = desc.inherited(|c| c.tag_field.clone());
    let tag = match (tag, tag_field) {
        (Some(Tag::Disabled), _) | (None, None) => None,
        (Some(tag), field) => Some((tag, field)),
        (None, Some(field)) => Some((Tag::ClassName, Some(field))),
    };
    let tag = tag.map(|(tag, field)| StructTag {
        field: field.unwrap_or_else(|| DEFAULT_TAG_FIELD.to_owned()),
        value: match tag {
            Tag::Str(s) => LiteralValue::Str(s),
            Tag::Int(i) => LiteralValue::Int(i),
            Tag::ClassName | Tag::Disabled => LiteralValue::Str(desc.name.clone()),
        },
    });

    StructHeader {
        name: desc.name.clone(),
        tag,
        options: StructOptions {
            array_like: desc.inherited(|c| c.array_like).unwrap_or(false),
            forbid_unknown_fields: desc.inherited(|c| c.forbid_unknown_fields).unwrap_or(false),
            omit_defaults: desc.inherited(|c| c.omit_defaults).unwrap_or(false),
        },
    }
}

fn invalid(ty: &str, message: impl Into<String>) -> CompileError {
    CompileError::InvalidConstraint {
        ty: ty.to_owned(),
        message: message.into(),
    }
}

fn check_int(c: &IntConstraints) -> Result<IntConstraints, CompileError> {
    if c.multiple_of == Some(0) {
        return Err(invalid("int", "multiple_of must be > 0"));
    }
    let lower = [c.gt.map(|v| v as i128 + 1), c.ge.map(|v| v as i128)]
        .into_iter()
        .flatten()
        .max();
    let upper = [c.lt.map(|v| v as i128 - 1), c.le.map(|v| v as i128)]
        .into_iter()
        .flatten()
        .min();
    if let (Some(lower), Some(upper)) = (lower, upper) {
        if lower > upper {
            return Err(invalid("int", "the bounds admit no values"));
        }
    }
    Ok(*c)
}

fn check_float(c: &FloatConstraints) -> Result<FloatConstraints, CompileError> {
    let bounds = [c.gt, c.ge, c.lt, c.le];
    if bounds.iter().flatten().any(|b| b.is_nan()) {
        return Err(invalid("float", "bounds can't be NaN"));
    }
    if let Some(m) = c.multiple_of {
        if !(m > 0.0) || !m.is_finite() {
            return Err(invalid("float", "multiple_of must be a finite number > 0"));
        }
    }
    // (bound, exclusive)
    let lower = [c.gt.map(|v| (v, true)), c.ge.map(|v| (v, false))]
        .into_iter()
        .flatten()
        .max_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let upper = [c.lt.map(|v| (v, true)), c.le.map(|v| (v, false))]
        .into_iter()
        .flatten()
        .min_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));
    if let (Some((lo, lo_strict)), Some((hi, hi_strict))) = (lower, upper) {
        if lo > hi || (lo == hi && (lo_strict || hi_strict)) {
            return Err(invalid("float", "the bounds admit no values"));
        }
    }
    Ok(*c)
}

fn check_len(ty: &str, len: &LenConstraints) -> Result<LenConstraints, CompileError> {
    if let (Some(min), Some(max)) = (len.min_length, len.max_length) {
        if min > max {
            return Err(invalid(ty, "min_length is greater than max_length"));
        }
    }
    Ok(*len)
}

fn str_schema(c: &StrConstraints) -> Result<StrSchema, CompileError> {
    let len = check_len(
        "str",
        &LenConstraints {
            min_length: c.min_length,
            max_length: c.max_length,
        },
    )?;
    let pattern = match &c.pattern {
        Some(pattern) => Some(Regex::new(pattern).map_err(|e| CompileError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?),
        None => None,
    };
    Ok(StrSchema { len, pattern })
}

/// Set items and map keys must be hashable: no mutable containers.
fn check_hashable(node: &Node, desc: &TypeDesc) -> Result<(), CompileError> {
    let hashable = match node {
        Node::Array(_) | Node::Map(_) | Node::Struct(_) => false,
        Node::Tuple(items) => return items.iter().try_for_each(|item| check_hashable(item, desc)),
        Node::Union(union) => union.array.is_none() && union.object.is_none(),
        _ => true,
    };
    if hashable {
        Ok(())
    } else {
        Err(CompileError::UnhashableType(desc.to_string()))
    }
}

fn check_map_key(node: &Node, desc: &TypeDesc) -> Result<(), CompileError> {
    match node {
        Node::Null | Node::Raw => Err(CompileError::InvalidMapKey(desc.to_string())),
        _ => check_hashable(node, desc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_schema::{FieldDesc, Rename, StructDesc, Value};

    fn structure(schema: &Schema) -> &StructSchema {
        match schema.root() {
            Node::Struct(index) => schema.struct_at(*index),
            other => panic!("expected a struct, got {:?}", other),
        }
    }

    #[test]
    fn field_order_and_kw_only() {
        let desc = StructDesc::new("User")
            .field(FieldDesc::new("id", TypeDesc::int()).kw_only())
            .field(FieldDesc::new("name", TypeDesc::str()))
            .field(FieldDesc::new("email", TypeDesc::str()).default(Value::Null));
        let schema = compile(&desc.into()).unwrap();
        let names: Vec<_> = structure(&schema).fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "email", "id"]);
    }

    #[test]
    fn inheritance_overrides_in_place() {
        let base = Arc::new(
            StructDesc::new("Base")
                .field(FieldDesc::new("a", TypeDesc::int()))
                .field(FieldDesc::new("b", TypeDesc::int()).default(Value::Int(1))),
        );
        let child = StructDesc::new("Child")
            .extends(base)
            .field(FieldDesc::new("a", TypeDesc::str()))
            .field(FieldDesc::new("c", TypeDesc::int()).default(Value::Int(2)));
        let schema = compile(&child.into()).unwrap();
        let s = structure(&schema);
        let names: Vec<_> = s.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(matches!(s.field(0).node, Node::Str(_)));
    }

    #[test]
    fn required_after_optional() {
        let desc = StructDesc::new("Bad")
            .field(FieldDesc::new("a", TypeDesc::int()).default(Value::Int(0)))
            .field(FieldDesc::new("b", TypeDesc::int()));
        assert_eq!(
            compile(&desc.into()).unwrap_err(),
            CompileError::RequiredAfterOptional { name: "Bad".into(), field: "b".into() }
        );
    }

    #[test]
    fn rename_and_collisions() {
        let desc = StructDesc::new("Renamed")
            .rename(Rename::Camel)
            .field(FieldDesc::new("first_name", TypeDesc::str()))
            .field(FieldDesc::new("other", TypeDesc::str()).rename("firstName"));
        assert_eq!(
            compile(&desc.into()).unwrap_err().to_string(),
            "The field \"firstName\" is defined twice in \"Renamed\""
        );

        let tagged = StructDesc::new("Tagged")
            .tag_field("kind")
            .field(FieldDesc::new("kind", TypeDesc::str()));
        assert!(matches!(
            compile(&tagged.into()),
            Err(CompileError::TagFieldCollision { .. })
        ));
    }

    #[test]
    fn tags_resolve_through_bases() {
        let base = Arc::new(StructDesc::new("Base").tag(Tag::Str("base".into())).tag_field("kind"));
        let child = Arc::new(StructDesc::new("Child").extends(base.clone()));
        let schema = compile(&TypeDesc::Tuple(vec![base.into(), child.into()])).unwrap();
        let tags: Vec<_> = schema.structs().iter().map(|s| s.tag().cloned().unwrap()).collect();
        assert_eq!(tags[0], StructTag { field: "kind".into(), value: "base".into() });
        assert_eq!(tags[1], StructTag { field: "kind".into(), value: "Child".into() });

        let plain = StructDesc::new("Plain").tag(Tag::Int(3));
        let schema = compile(&plain.into()).unwrap();
        assert_eq!(structure(&schema).tag().unwrap().field, "type");
    }

    #[test]
    fn recursive_references() {
        let node = StructDesc::new("Node")
            .field(FieldDesc::new("value", TypeDesc::int()))
            .field(
                FieldDesc::new("next", TypeDesc::optional(TypeDesc::reference("Node")))
                    .default(Value::Null),
            );
        let schema = compile(&node.into()).unwrap();
        assert_eq!(schema.structs().len(), 1);
        assert!(structure(&schema).is_trackable());
        assert_eq!(
            compile(&TypeDesc::reference("Missing")).unwrap_err(),
            CompileError::UndefinedType("Missing".into())
        );
    }

    #[test]
    fn constraints() {
        assert!(compile(&TypeDesc::Int(IntConstraints::new().gt(5).lt(6))).is_err());
        assert!(compile(&TypeDesc::Int(IntConstraints::new().ge(5).le(5))).is_ok());
        assert!(compile(&TypeDesc::Int(IntConstraints::new().multiple_of(0))).is_err());
        assert!(compile(&TypeDesc::Float(FloatConstraints::new().gt(1.0).le(1.0))).is_err());
        assert!(compile(&TypeDesc::Float(FloatConstraints::new().multiple_of(-1.0))).is_err());
        assert!(matches!(
            compile(&TypeDesc::Str(StrConstraints::new().pattern("("))),
            Err(CompileError::InvalidPattern { .. })
        ));
        assert!(compile(&TypeDesc::Str(StrConstraints::new().min(3).max(2))).is_err());
        assert!(matches!(
            compile(&TypeDesc::set(TypeDesc::list(TypeDesc::int()))),
            Err(CompileError::UnhashableType(_))
        ));
        assert!(matches!(
            compile(&TypeDesc::map(TypeDesc::Null, TypeDesc::int())),
            Err(CompileError::InvalidMapKey(_))
        ));
    }

    #[test]
    fn enums() {
        let mixed = keel_schema::EnumDesc::new(
            "Mixed",
            [("A", LiteralValue::Int(1)), ("B", LiteralValue::from("b"))],
        );
        assert_eq!(
            compile(&mixed.into()).unwrap_err().to_string(),
            "The enum \"Mixed\" mixes str and int values"
        );
    }
}
